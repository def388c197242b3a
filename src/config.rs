//! Element properties.
//!
//! Three properties configure the element: the AKE peer (`dtcp1host`,
//! `dtcp1port`) and the directory holding the device keys
//! (`dtcpip_storage`). They can be set typed, by name, from
//! `name=value` strings as written on a launch line, or from YAML.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Host name or IP address for DTCP AKE negotiation.
pub const PROP_DTCP1HOST: &str = "dtcp1host";
/// Host port number for DTCP AKE negotiation.
pub const PROP_DTCP1PORT: &str = "dtcp1port";
/// Directory that contains the client's keys.
pub const PROP_DTCPIP_STORAGE: &str = "dtcpip_storage";

/// Placeholder peer address used until one is configured.
pub const DEFAULT_PEER_HOST: &str = "128.0.0.1";
/// Default AKE port.
pub const DEFAULT_PEER_PORT: u16 = 8999;

/// Type of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    String,
    UInt,
}

/// Description of one property, for introspection.
#[derive(Debug, Clone, Copy)]
pub struct PropertySpec {
    pub name: &'static str,
    pub blurb: &'static str,
    pub value_type: PropertyType,
}

/// All properties the element exposes.
pub const PROPERTIES: [PropertySpec; 3] = [
    PropertySpec {
        name: PROP_DTCP1HOST,
        blurb: "Host name or IP address for DTCP AKE negotiation",
        value_type: PropertyType::String,
    },
    PropertySpec {
        name: PROP_DTCP1PORT,
        blurb: "Host port number for DTCP AKE negotiation",
        value_type: PropertyType::UInt,
    },
    PropertySpec {
        name: PROP_DTCPIP_STORAGE,
        blurb: "Directory that contains client's keys",
        value_type: PropertyType::String,
    },
];

/// A dynamically typed property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    String(String),
    UInt(u32),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(value) => write!(f, "\"{}\"", value),
            PropertyValue::UInt(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        PropertyValue::UInt(value)
    }
}

/// Property values of one element instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    #[serde(rename = "dtcp1host", alias = "peer_host")]
    pub peer_host: String,
    #[serde(rename = "dtcp1port", alias = "peer_port")]
    pub peer_port: u16,
    #[serde(rename = "dtcpip_storage", alias = "key_storage_dir")]
    pub key_storage_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            peer_host: DEFAULT_PEER_HOST.to_string(),
            peer_port: DEFAULT_PEER_PORT,
            key_storage_dir: std::env::temp_dir(),
        }
    }
}

impl Settings {
    /// Parse settings from a YAML document; missing keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load settings from a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Set a property by name.
    pub fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<()> {
        trace!("Setting property: {}", name);
        match (name, value) {
            (PROP_DTCP1HOST, PropertyValue::String(host)) => {
                self.peer_host = host;
                info!("Host property: {}", self.peer_host);
            }
            (PROP_DTCP1PORT, PropertyValue::UInt(port)) => {
                self.peer_port = u16::try_from(port).map_err(|_| Error::InvalidPropertyValue {
                    name: name.to_string(),
                    reason: format!("{} is outside 0..=65535", port),
                })?;
                info!("Port property: {}", self.peer_port);
            }
            (PROP_DTCPIP_STORAGE, PropertyValue::String(dir)) => {
                self.key_storage_dir = PathBuf::from(dir);
                info!("Key storage property: {}", self.key_storage_dir.display());
            }
            (PROP_DTCP1HOST | PROP_DTCP1PORT | PROP_DTCPIP_STORAGE, value) => {
                return Err(Error::InvalidPropertyValue {
                    name: name.to_string(),
                    reason: format!("value {} has the wrong type", value),
                });
            }
            _ => {
                info!("Unknown property: {}", name);
                return Err(Error::UnknownProperty(name.to_string()));
            }
        }
        Ok(())
    }

    /// Get a property by name.
    pub fn property(&self, name: &str) -> Result<PropertyValue> {
        trace!("Getting property: {}", name);
        match name {
            PROP_DTCP1HOST => Ok(PropertyValue::String(self.peer_host.clone())),
            PROP_DTCP1PORT => Ok(PropertyValue::UInt(u32::from(self.peer_port))),
            PROP_DTCPIP_STORAGE => Ok(PropertyValue::String(
                self.key_storage_dir.to_string_lossy().into_owned(),
            )),
            _ => Err(Error::UnknownProperty(name.to_string())),
        }
    }

    /// Apply a launch-line assignment such as `dtcp1port=8999`.
    pub fn set_property_from_str(&mut self, assignment: &str) -> Result<()> {
        let (name, raw) = assignment
            .split_once('=')
            .ok_or_else(|| Error::InvalidPropertyValue {
                name: assignment.to_string(),
                reason: "expected name=value".to_string(),
            })?;
        let name = name.trim();
        let spec = PROPERTIES
            .iter()
            .find(|spec| spec.name == name)
            .ok_or_else(|| Error::UnknownProperty(name.to_string()))?;

        let value = match spec.value_type {
            PropertyType::String => PropertyValue::String(raw.to_string()),
            PropertyType::UInt => {
                PropertyValue::UInt(raw.trim().parse().map_err(|e| Error::InvalidPropertyValue {
                    name: name.to_string(),
                    reason: format!("{:?} is not an unsigned integer: {}", raw, e),
                })?)
            }
        };
        self.set_property(name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_property_specs() {
        let settings = Settings::default();
        assert_eq!(settings.peer_host, DEFAULT_PEER_HOST);
        assert_eq!(settings.peer_port, 8999);
        assert_eq!(settings.key_storage_dir, std::env::temp_dir());
    }

    #[test]
    fn set_and_get_by_name() {
        let mut settings = Settings::default();
        settings
            .set_property(PROP_DTCP1HOST, "10.4.19.241".into())
            .expect("host");
        settings.set_property(PROP_DTCP1PORT, 9000u32.into()).expect("port");
        settings
            .set_property(PROP_DTCPIP_STORAGE, "/var/lib/dtcp".into())
            .expect("storage");

        assert_eq!(
            settings.property(PROP_DTCP1HOST).expect("host"),
            PropertyValue::String("10.4.19.241".to_string())
        );
        assert_eq!(
            settings.property(PROP_DTCP1PORT).expect("port"),
            PropertyValue::UInt(9000)
        );
        assert_eq!(settings.key_storage_dir, PathBuf::from("/var/lib/dtcp"));
    }

    #[test]
    fn port_out_of_range_is_rejected() {
        let mut settings = Settings::default();
        let err = settings
            .set_property(PROP_DTCP1PORT, 65536u32.into())
            .expect_err("out of range");
        assert!(err.is_configuration());
        assert_eq!(settings.peer_port, DEFAULT_PEER_PORT);
    }

    #[test]
    fn wrong_type_and_unknown_name_are_configuration_errors() {
        let mut settings = Settings::default();
        let err = settings
            .set_property(PROP_DTCP1HOST, 5u32.into())
            .expect_err("wrong type");
        assert!(matches!(err, Error::InvalidPropertyValue { .. }));

        let err = settings.property("silent").expect_err("unknown");
        assert!(matches!(err, Error::UnknownProperty(ref name) if name == "silent"));
    }

    #[test]
    fn launch_line_assignments() {
        let mut settings = Settings::default();
        settings
            .set_property_from_str("dtcp1host=10.4.19.241")
            .expect("host");
        settings.set_property_from_str("dtcp1port=8998").expect("port");
        assert_eq!(settings.peer_host, "10.4.19.241");
        assert_eq!(settings.peer_port, 8998);

        assert!(settings.set_property_from_str("dtcp1port=abc").is_err());
        assert!(settings.set_property_from_str("dtcp1port").is_err());
        assert!(matches!(
            settings.set_property_from_str("silent=true"),
            Err(Error::UnknownProperty(_))
        ));
    }

    #[test]
    fn yaml_keeps_defaults_for_missing_keys() {
        let settings = Settings::from_yaml("dtcp1host: 192.168.0.10\n").expect("yaml");
        assert_eq!(settings.peer_host, "192.168.0.10");
        assert_eq!(settings.peer_port, DEFAULT_PEER_PORT);

        let settings =
            Settings::from_yaml("peer_port: 7000\nkey_storage_dir: /keys\n").expect("aliases");
        assert_eq!(settings.peer_port, 7000);
        assert_eq!(settings.key_storage_dir, PathBuf::from("/keys"));

        assert!(Settings::from_yaml("dtcp1port: 70000\n").is_err());
        assert!(Settings::from_yaml("bogus: 1\n").is_err());
    }
}
