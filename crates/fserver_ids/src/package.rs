use crate::{validate_segment, IdParseError};
use serde::{Deserialize, Serialize};
use std::fmt;

const TEST_BUNDLE_EXTENSION: &str = ".ftp";
const BINARY_BUNDLE_EXTENSION: &str = ".ftbp";

/// Manifest member inside a binary package bundle.
pub const BINARY_MANIFEST_NAME: &str = "binary-package.json";
/// Manifest member inside a test package bundle, under `<name>/`.
pub const TEST_MANIFEST_NAME: &str = "test.yaml";

/// Test package identity, derived from `<name>-<version>-<release>.ftp`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TestPackageId {
    name: String,
    stem: String,
}

impl TestPackageId {
    pub fn from_bundle_name(filename: &str) -> Result<Self, IdParseError> {
        let stem = filename.strip_suffix(TEST_BUNDLE_EXTENSION).ok_or_else(|| {
            IdParseError::new(format!(
                "Invalid filename for test: '{}' (expected .ftp extension)",
                filename
            ))
        })?;
        Self::from_stem(stem)
    }

    pub fn from_stem(stem: &str) -> Result<Self, IdParseError> {
        validate_segment("test package", stem)?;
        let name = stem.split('-').next().unwrap_or_default();
        validate_segment("test name", name)?;
        Ok(Self {
            name: name.to_string(),
            stem: stem.to_string(),
        })
    }

    /// Test name: everything before the first `-`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<name>-<version>-<release>`, used as the manifest record stem.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Path of the manifest inside the bundle.
    pub fn manifest_member(&self) -> String {
        format!("{}/{}", self.name, TEST_MANIFEST_NAME)
    }
}

impl fmt::Display for TestPackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stem)
    }
}

/// Test category marker embedded in binary package names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TestType {
    Functional,
    Benchmark,
}

impl TestType {
    pub const ALL: [TestType; 2] = [TestType::Functional, TestType::Benchmark];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Functional => "Functional",
            TestType::Benchmark => "Benchmark",
        }
    }

    /// The `-<Type>.` marker that splits toolchain from test name.
    pub fn marker(&self) -> &'static str {
        match self {
            TestType::Functional => "-Functional.",
            TestType::Benchmark => "-Benchmark.",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Binary package identity: `<toolchain>-<Functional|Benchmark>.<name>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BinaryPackageId {
    toolchain: String,
    test_type: TestType,
    name: String,
}

impl BinaryPackageId {
    pub fn from_bundle_name(filename: &str) -> Result<Self, IdParseError> {
        let stem = filename.strip_suffix(BINARY_BUNDLE_EXTENSION).ok_or_else(|| {
            IdParseError::new(format!(
                "Invalid filename for binary package: '{}' (expected .ftbp extension)",
                filename
            ))
        })?;
        Self::from_stem(stem)
    }

    /// Split a stem at the earliest test-type marker.
    pub fn from_stem(stem: &str) -> Result<Self, IdParseError> {
        validate_segment("binary package", stem)?;
        let (index, test_type) = TestType::ALL
            .iter()
            .filter_map(|t| stem.find(t.marker()).map(|i| (i, *t)))
            .min_by_key(|(i, _)| *i)
            .ok_or_else(|| {
                IdParseError::new(format!(
                    "Invalid binary package name '{}': missing -Functional. or -Benchmark. marker",
                    stem
                ))
            })?;

        let toolchain = &stem[..index];
        let name = &stem[index + test_type.marker().len()..];
        validate_segment("toolchain", toolchain)?;
        validate_segment("test name", name)?;

        Ok(Self {
            toolchain: toolchain.to_string(),
            test_type,
            name: name.to_string(),
        })
    }

    pub fn toolchain(&self) -> &str {
        &self.toolchain
    }

    pub fn test_type(&self) -> TestType {
        self.test_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stem(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BinaryPackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}.{}", self.toolchain, self.test_type, self.name)
    }
}
