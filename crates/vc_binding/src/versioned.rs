//! Whole-file persistence with a format version.

use alloc::vec::Vec;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use vc_value::{ContainerKind, ValueKind};

use crate::binding::unbox;
use crate::{
    Bind, ErrorKind, ObjectSerializer, ReadConfiguration, Result, SerializationError, WriteConfiguration,
};

const VERSION_FIELD: &str = "version";
const DATA_FIELD: &str = "data";

/// A file holding one value next to the version of its layout.
///
/// The value is stored as `{ version, data }`. Reading a file written with
/// another version, or a file that does not exist, yields `None` so the
/// caller can fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedFile {
    path: PathBuf,
    version: u32,
}

impl VersionedFile {
    pub fn new(path: impl Into<PathBuf>, version: u32) -> Self {
        Self {
            path: path.into(),
            version,
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Replaces the file content with `value`.
    pub fn write<T: Bind>(
        &self,
        serializer: &ObjectSerializer,
        value: &T,
        config: &WriteConfiguration,
    ) -> Result<()> {
        let binding = serializer.producer().root_binding::<T>()?;
        let mut out = Vec::new();
        serializer.write_with(&mut out, config.binary, config, |ctx| {
            let writer = ctx.writer();
            writer.step_in(ContainerKind::Struct)?;
            writer.set_field_name(VERSION_FIELD);
            writer.write_int(i64::from(self.version))?;
            writer.set_field_name(DATA_FIELD);
            binding.serialize(value, ctx)?;
            ctx.writer().step_out()?;
            Ok(())
        })?;
        fs::write(&self.path, out)?;
        Ok(())
    }

    /// Reads the stored value, `None` if the file is missing or has
    /// another version.
    pub fn read<T: Bind>(&self, serializer: &ObjectSerializer, config: &ReadConfiguration) -> Result<Option<T>> {
        let input = match fs::read(&self.path) {
            Ok(input) => input,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        let binding = serializer.producer().root_binding::<T>()?;
        let expected = i64::from(self.version);
        let ((version, data), _) = serializer.read_with(&input, config, |ctx| {
            ctx.expect_kind(ValueKind::Struct, "versioned file")?;
            let mut version = None;
            let mut data = None;

            ctx.reader().step_in()?;
            while let Some(kind) = ctx.reader().next()? {
                let field = ctx.reader().field_name();
                let is_version = field == Some(VERSION_FIELD);
                let is_data = field == Some(DATA_FIELD);
                if is_version && kind == ValueKind::Int {
                    version = Some(ctx.reader().int_value()?);
                } else if is_data && version == Some(expected) {
                    data = Some(binding.deserialize(ctx)?);
                }
            }
            ctx.reader().step_out()?;
            Ok((version, data))
        })?;

        if version != Some(expected) {
            log::debug!(
                "{} has version {version:?}, expected {expected}",
                self.path.display()
            );
            return Ok(None);
        }
        let data = data.ok_or_else(|| {
            SerializationError::new(
                ErrorKind::EmptyInput,
                alloc::format!("{} has no data", self.path.display()),
            )
        })?;
        unbox::<T>(data).map(Some)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::string::{String, ToString};
    use alloc::vec;
    use alloc::vec::Vec;
    use std::fs;

    use super::VersionedFile;
    use crate::{ErrorKind, ObjectSerializer, ReadConfiguration, WriteConfiguration};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(alloc::format!("vc_binding-{}-{name}", std::process::id()))
    }

    #[test]
    fn versions_must_match() {
        let serializer = ObjectSerializer::new();
        let path = temp_path("settings");
        let value: Vec<String> = vec!["recent".to_string(), "files".to_string()];

        let file = VersionedFile::new(&path, 2);
        file.write(&serializer, &value, &WriteConfiguration::default()).unwrap();

        let back: Option<Vec<String>> = file.read(&serializer, &ReadConfiguration::default()).unwrap();
        assert_eq!(back, Some(value));

        let newer = VersionedFile::new(&path, 3);
        let back: Option<Vec<String>> = newer.read(&serializer, &ReadConfiguration::default()).unwrap();
        assert_eq!(back, None);

        fs::remove_file(&path).unwrap();
        let back: Option<Vec<String>> = file.read(&serializer, &ReadConfiguration::default()).unwrap();
        assert_eq!(back, None);
    }

    #[test]
    fn missing_data_is_an_error() {
        let serializer = ObjectSerializer::new();
        let path = temp_path("empty");
        fs::write(&path, "{ version: 1 }").unwrap();

        let error = VersionedFile::new(&path, 1)
            .read::<i32>(&serializer, &ReadConfiguration::default())
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::EmptyInput);
        fs::remove_file(&path).unwrap();
    }
}
