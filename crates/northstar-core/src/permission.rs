use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Permission level a user holds on a notebook.
///
/// Levels are not ordered. Each one grants its own capability set, and
/// checks are made with [`Permission::grants`] rather than by comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Permission {
    /// Zero value returned when no access record exists. Never stored.
    #[default]
    None,
    Read,
    ReadExecute,
    ReadWrite,
    ReadWriteExecute,
    Owner,
}

/// Capability an operation requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Read,
    Write,
    Execute,
    ManageUsers,
    Delete,
}

impl Permission {
    /// Check whether this level includes the capability
    pub fn grants(self, capability: Capability) -> bool {
        use Capability::*;

        match self {
            Permission::None => false,
            Permission::Read => matches!(capability, Read),
            Permission::ReadExecute => matches!(capability, Read | Execute),
            Permission::ReadWrite => matches!(capability, Read | Write),
            Permission::ReadWriteExecute => matches!(capability, Read | Write | Execute),
            Permission::Owner => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::None => "None",
            Permission::Read => "Read",
            Permission::ReadExecute => "ReadExecute",
            Permission::ReadWrite => "ReadWrite",
            Permission::ReadWriteExecute => "ReadWriteExecute",
            Permission::Owner => "Owner",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" | "" => Ok(Permission::None),
            "Read" => Ok(Permission::Read),
            "ReadExecute" => Ok(Permission::ReadExecute),
            "ReadWrite" => Ok(Permission::ReadWrite),
            "ReadWriteExecute" => Ok(Permission::ReadWriteExecute),
            "Owner" => Ok(Permission::Owner),
            other => Err(format!("unknown permission '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Permission; 6] = [
        Permission::None,
        Permission::Read,
        Permission::ReadExecute,
        Permission::ReadWrite,
        Permission::ReadWriteExecute,
        Permission::Owner,
    ];

    #[test]
    fn test_capability_table() {
        use Capability::*;

        let expected: [(Permission, [bool; 5]); 6] = [
            (Permission::None, [false, false, false, false, false]),
            (Permission::Read, [true, false, false, false, false]),
            (Permission::ReadExecute, [true, false, true, false, false]),
            (Permission::ReadWrite, [true, true, false, false, false]),
            (Permission::ReadWriteExecute, [true, true, true, false, false]),
            (Permission::Owner, [true, true, true, true, true]),
        ];

        for (permission, row) in expected {
            for (capability, allowed) in [Read, Write, Execute, ManageUsers, Delete].iter().zip(row) {
                assert_eq!(
                    permission.grants(*capability),
                    allowed,
                    "{} / {:?}",
                    permission,
                    capability
                );
            }
        }
    }

    #[test]
    fn test_parse_display() {
        for permission in ALL {
            assert_eq!(permission.to_string().parse::<Permission>(), Ok(permission));
        }
        assert_eq!("".parse::<Permission>(), Ok(Permission::None));
        assert!("Admin".parse::<Permission>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Permission::ReadWriteExecute).unwrap();
        assert_eq!(json, "\"ReadWriteExecute\"");
        let parsed: Permission = serde_json::from_str("\"Owner\"").unwrap();
        assert_eq!(parsed, Permission::Owner);
    }
}
