// OS family command templates

use std::fmt;
use std::str::FromStr;

use crate::output::errors::ConfigError;

mod detect;

pub use detect::{detect, OsInfo, OS_RELEASE_COMMAND};

/// A template set mapping provisioning intents to shell commands.
///
/// Every method is a pure function of the family and its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    /// apt / adduser based systems
    Debian,
    /// dnf / useradd based systems
    Fedora,
}

impl OsFamily {
    pub fn create_user(&self, username: &str) -> String {
        match self {
            OsFamily::Debian => format!("adduser {}", username),
            OsFamily::Fedora => format!("useradd {}", username),
        }
    }

    pub fn check_user(&self, username: &str) -> String {
        format!("id -u {}", username)
    }

    pub fn group_user(&self, username: &str, group: &str) -> String {
        format!("usermod -aG {} {}", group, username)
    }

    pub fn install_package(&self, package: &str) -> String {
        match self {
            OsFamily::Debian => format!("apt-get install -y {}", package),
            OsFamily::Fedora => format!("dnf install -y {}", package),
        }
    }

    pub fn remove_package(&self, package: &str) -> String {
        match self {
            OsFamily::Debian => format!("apt-get remove -y {}", package),
            OsFamily::Fedora => format!("dnf remove -y {}", package),
        }
    }

    pub fn update_packages(&self) -> String {
        match self {
            OsFamily::Debian => "apt-get update && apt-get upgrade -y".to_string(),
            OsFamily::Fedora => "dnf update -y".to_string(),
        }
    }

    pub fn start_service(&self, service: &str) -> String {
        format!("systemctl start {}", service)
    }

    pub fn stop_service(&self, service: &str) -> String {
        format!("systemctl stop {}", service)
    }

    pub fn enable_service(&self, service: &str) -> String {
        format!("systemctl enable {}", service)
    }

    pub fn restart_service(&self, service: &str) -> String {
        format!("systemctl restart {}", service)
    }
}

/// A concrete distribution. Each one delegates to the template set of its family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Distribution {
    Ubuntu,
    Debian,
    Fedora,
    RedHat,
}

impl Distribution {
    pub fn family(&self) -> OsFamily {
        match self {
            Distribution::Ubuntu | Distribution::Debian => OsFamily::Debian,
            Distribution::Fedora | Distribution::RedHat => OsFamily::Fedora,
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Distribution::Ubuntu => "ubuntu",
            Distribution::Debian => "debian",
            Distribution::Fedora => "fedora",
            Distribution::RedHat => "redhat",
        };
        f.write_str(name)
    }
}

impl FromStr for Distribution {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ubuntu" => Ok(Distribution::Ubuntu),
            "debian" => Ok(Distribution::Debian),
            "fedora" => Ok(Distribution::Fedora),
            "rhel" | "redhat" => Ok(Distribution::RedHat),
            _ => Err(ConfigError::UnknownDistribution(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_are_stable() {
        for family in [OsFamily::Debian, OsFamily::Fedora] {
            assert_eq!(family.check_user("john"), family.check_user("john"));
            assert_eq!(family.create_user("john"), family.create_user("john"));
        }
    }

    #[test]
    fn test_debian_templates() {
        let os = OsFamily::Debian;
        assert_eq!(os.create_user("john"), "adduser john");
        assert_eq!(os.check_user("john"), "id -u john");
        assert_eq!(os.group_user("john", "audio"), "usermod -aG audio john");
        assert_eq!(os.install_package("nginx"), "apt-get install -y nginx");
        assert_eq!(os.remove_package("nginx"), "apt-get remove -y nginx");
        assert_eq!(os.update_packages(), "apt-get update && apt-get upgrade -y");
    }

    #[test]
    fn test_fedora_templates() {
        let os = OsFamily::Fedora;
        assert_eq!(os.create_user("john"), "useradd john");
        assert_eq!(os.install_package("nginx"), "dnf install -y nginx");
        assert_eq!(os.update_packages(), "dnf update -y");
        assert_eq!(os.restart_service("nginx"), "systemctl restart nginx");
    }

    #[test]
    fn test_distribution_delegates_to_family() {
        assert_eq!(Distribution::Ubuntu.family(), OsFamily::Debian);
        assert_eq!(Distribution::Debian.family(), OsFamily::Debian);
        assert_eq!(Distribution::Fedora.family(), OsFamily::Fedora);
        assert_eq!(Distribution::RedHat.family(), OsFamily::Fedora);
    }

    #[test]
    fn test_distribution_from_str() {
        assert_eq!("Ubuntu".parse::<Distribution>().unwrap(), Distribution::Ubuntu);
        assert_eq!("rhel".parse::<Distribution>().unwrap(), Distribution::RedHat);
        assert!("arch".parse::<Distribution>().is_err());
    }
}
