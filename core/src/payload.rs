/// One host file destined for the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub name: String,
    pub data: Vec<u8>,
}

impl FileSpec {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// A root-level subdirectory and the files it holds, in on-disk order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySpec {
    pub name: String,
    pub files: Vec<FileSpec>,
}

impl DirectorySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
        }
    }

    pub fn with_files(name: impl Into<String>, files: Vec<FileSpec>) -> Self {
        Self {
            name: name.into(),
            files,
        }
    }
}

/// Everything that goes into one image. Order is preserved on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRequest {
    pub root_files: Vec<FileSpec>,
    pub directories: Vec<DirectorySpec>,
}

impl ImageRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root_file(&mut self, file: FileSpec) {
        self.root_files.push(file);
    }

    /// Append files to the directory called `name`, creating it on first use.
    /// Repeated names merge into the first group so directory order stays
    /// first-seen.
    pub fn add_directory_files(&mut self, name: &str, files: impl IntoIterator<Item = FileSpec>) {
        let index = match self.directories.iter().position(|d| d.name == name) {
            Some(index) => index,
            None => {
                self.directories.push(DirectorySpec::new(name));
                self.directories.len() - 1
            }
        };
        self.directories[index].files.extend(files);
    }

    /// Total number of payload bytes across every file.
    pub fn payload_bytes(&self) -> u64 {
        let root: u64 = self.root_files.iter().map(|f| f.data.len() as u64).sum();
        let dirs: u64 = self
            .directories
            .iter()
            .flat_map(|d| d.files.iter())
            .map(|f| f.data.len() as u64)
            .sum();
        root + dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_directory_names_merge_in_first_seen_order() {
        let mut request = ImageRequest::new();
        request.add_directory_files("bin", vec![FileSpec::new("a", b"1".to_vec())]);
        request.add_directory_files("etc", vec![FileSpec::new("b", b"2".to_vec())]);
        request.add_directory_files("bin", vec![FileSpec::new("c", b"3".to_vec())]);

        assert_eq!(request.directories.len(), 2);
        assert_eq!(request.directories[0].name, "bin");
        let names: Vec<_> = request.directories[0].files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(request.directories[1].name, "etc");
    }

    #[test]
    fn payload_counts_root_and_directory_files() {
        let mut request = ImageRequest::new();
        request.add_root_file(FileSpec::new("x", vec![0u8; 10]));
        request.add_directory_files("d", vec![FileSpec::new("y", vec![0u8; 5])]);
        assert_eq!(request.payload_bytes(), 15);
    }

    #[test]
    fn empty_directory_group_is_kept() {
        let mut request = ImageRequest::new();
        request.add_directory_files("empty", Vec::new());
        assert_eq!(request.directories, vec![DirectorySpec::new("empty")]);
    }
}
