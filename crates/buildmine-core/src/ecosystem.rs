//! Build languages and test frameworks.
//!
//! Pure types and data: which root files signal a build language, and which
//! files and dependency patterns signal a test framework. Detection against
//! a live repository lives in [`crate::detect`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A build toolchain recognized from root-level build files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildLanguage {
    /// Ruby (`Gemfile`, `Rakefile`).
    Ruby,
    /// Java built with Ant (`build.xml`).
    JavaAnt,
    /// Java built with Maven (`pom.xml`).
    JavaMaven,
    /// Java built with Gradle (`build.gradle`, `settings.gradle`, `build.gradle.kts`).
    JavaGradle,
    /// Python packaging files.
    Python,
    /// Node.js (`package.json`).
    Node,
    /// PHP with Composer (`composer.json`).
    Php,
}

impl BuildLanguage {
    /// All build languages, in detection priority order.
    pub const ALL: &[Self] = &[
        Self::Ruby,
        Self::JavaAnt,
        Self::JavaMaven,
        Self::JavaGradle,
        Self::Python,
        Self::Node,
        Self::Php,
    ];

    /// Root file names that signal this build language.
    pub const fn marker_files(self) -> &'static [&'static str] {
        match self {
            Self::Ruby => &["Gemfile", "Rakefile"],
            Self::JavaAnt => &["build.xml"],
            Self::JavaMaven => &["pom.xml"],
            Self::JavaGradle => &["build.gradle", "settings.gradle", "build.gradle.kts"],
            Self::Python => &["requirements.txt", "setup.py", "pyproject.toml"],
            Self::Node => &["package.json"],
            Self::Php => &["composer.json"],
        }
    }

    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ruby => "ruby",
            Self::JavaAnt => "java-ant",
            Self::JavaMaven => "java-maven",
            Self::JavaGradle => "java-gradle",
            Self::Python => "python",
            Self::Node => "node",
            Self::Php => "php",
        }
    }
}

impl fmt::Display for BuildLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildLanguage {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|lang| lang.as_str() == wanted)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

/// A test framework whose console summary can be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestFramework {
    /// JUnit; the log format depends on the build language.
    Junit,
    /// RSpec.
    Rspec,
    /// Ruby test-unit.
    Testunit,
    /// Cucumber for Ruby.
    CucumberRuby,
    /// Cucumber for the JVM, reported through Surefire.
    CucumberJava,
    /// PHPUnit.
    Phpunit,
    /// pytest.
    Pytest,
    /// Python unittest.
    Unittest,
    /// Jest.
    Jest,
    /// Mocha.
    Mocha,
    /// NUnit console runner.
    Nunit,
    /// `go test` summary.
    GoTest,
}

impl TestFramework {
    /// All frameworks, in detection priority order.
    pub const ALL: &[Self] = &[
        Self::Junit,
        Self::Rspec,
        Self::Testunit,
        Self::CucumberRuby,
        Self::CucumberJava,
        Self::Phpunit,
        Self::Pytest,
        Self::Unittest,
        Self::Jest,
        Self::Mocha,
        Self::Nunit,
        Self::GoTest,
    ];

    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Junit => "junit",
            Self::Rspec => "rspec",
            Self::Testunit => "testunit",
            Self::CucumberRuby => "cucumber-ruby",
            Self::CucumberJava => "cucumber-java",
            Self::Phpunit => "phpunit",
            Self::Pytest => "pytest",
            Self::Unittest => "unittest",
            Self::Jest => "jest",
            Self::Mocha => "mocha",
            Self::Nunit => "nunit",
            Self::GoTest => "go-test",
        }
    }

    /// Root files whose content may declare this framework.
    ///
    /// Empty for frameworks that are only selected by name.
    pub const fn candidate_files(self) -> &'static [&'static str] {
        match self {
            Self::Junit | Self::CucumberJava => &["pom.xml", "build.gradle"],
            Self::Rspec | Self::CucumberRuby => &["Gemfile", "Rakefile"],
            Self::Testunit => &["Gemfile"],
            Self::Phpunit => &["composer.json"],
            Self::Pytest | Self::Unittest => &["requirements.txt", "setup.py", "pyproject.toml"],
            Self::Jest | Self::Mocha => &["package.json"],
            Self::Nunit | Self::GoTest => &[],
        }
    }

    /// Regex that confirms the framework inside a candidate file.
    pub const fn dependency_pattern(self) -> Option<&'static str> {
        match self {
            Self::Junit => Some(r"junit"),
            Self::Rspec => Some(r"rspec"),
            Self::Testunit => Some(r#"gem\s*['"]test-unit['"]"#),
            Self::CucumberRuby => Some(r#"gem\s*['"]cucumber['"]|cucumber"#),
            Self::CucumberJava => Some(r"cucumber-java|cucumber-junit|io\.cucumber:cucumber"),
            Self::Phpunit => Some(r#""phpunit/phpunit""#),
            Self::Pytest => Some(r"pytest"),
            Self::Unittest => Some(r"unittest"),
            Self::Jest => Some(r#""jest""#),
            Self::Mocha => Some(r#""mocha""#),
            Self::Nunit | Self::GoTest => None,
        }
    }
}

impl fmt::Display for TestFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestFramework {
    type Err = UnknownName;

    /// Case-insensitive; spaces and underscores read as dashes, so
    /// `"Go test"` and `"Cucumber_Java"` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '_' => '-',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        Self::ALL
            .iter()
            .copied()
            .find(|fw| fw.as_str() == wanted)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

/// A language or framework name that is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized name: {0:?}")]
pub struct UnknownName(pub String);
