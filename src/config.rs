//! mongo_copy configuration, express in toml.
//!
//! Every key is optional, missing keys use the defaults below.  Command line
//! options override values read from the file.
//!
//! Basic configuration file example:
//! ```toml
//! [src]
//! host = "localhost"
//! port = 27017
//! user = "root"
//! password = "secret"
//! db = "db"
//! coll = "docs"
//!
//! [dst]
//! host = "192.168.10.67"
//! tls = true
//! ca_cert_path = "/etc/ssl/mongo-ca.pem"
//! db = "db_copy"
//! coll = "docs"
//!
//! [copy]
//! threads = 8
//! batch_size = 1000
//! key_field = "_id"
//! ```
use crate::error::Result;
use crate::DEFAULT_KEY_FIELD;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Global copy configuration.
#[derive(Deserialize, Debug, Default)]
pub struct CopyConf {
    /// where documents are read from.
    #[serde(default)]
    pub src: ConnSettings,
    /// where documents are written to.
    #[serde(default)]
    pub dst: ConnSettings,
    /// copy tuning.
    #[serde(default)]
    pub copy: CopyOptions,
}

impl CopyConf {
    /// read configuration from toml file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<CopyConf> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

/// Connection settings of one mongodb instance, along with the collection to copy from or into.
#[derive(Deserialize, Debug, Clone)]
pub struct ConnSettings {
    /// host name or ip address.
    #[serde(default = "default_host")]
    pub host: String,
    /// port number.
    #[serde(default = "default_port")]
    pub port: u16,
    /// user name, empty means connect without credential.
    #[serde(default)]
    pub user: String,
    /// password of `user`.
    #[serde(default)]
    pub password: String,
    /// connect over TLS.
    #[serde(default)]
    pub tls: bool,
    /// CA certificate used to verify the server when `tls` is enabled.
    #[serde(default)]
    pub ca_cert_path: String,
    /// database name.
    #[serde(default = "default_db")]
    pub db: String,
    /// collection name.
    #[serde(default = "default_coll")]
    pub coll: String,
}

impl Default for ConnSettings {
    fn default() -> Self {
        ConnSettings {
            host: default_host(),
            port: default_port(),
            user: String::new(),
            password: String::new(),
            tls: false,
            ca_cert_path: String::new(),
            db: default_db(),
            coll: default_coll(),
        }
    }
}

impl ConnSettings {
    /// `host:port` pair, used for connection and log messages.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Copy tuning options.
#[derive(Deserialize, Debug, Clone)]
pub struct CopyOptions {
    /// how many partitions (and worker threads) the collection is split into.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// documents per insert batch, also used as the source cursor batch size.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// string field used as the ordered document key.
    #[serde(default = "default_key_field")]
    pub key_field: String,
}

impl Default for CopyOptions {
    fn default() -> Self {
        CopyOptions {
            threads: default_threads(),
            batch_size: default_batch_size(),
            key_field: default_key_field(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    27017
}

fn default_db() -> String {
    "db".to_string()
}

fn default_coll() -> String {
    "docs".to_string()
}

fn default_threads() -> usize {
    1
}

fn default_batch_size() -> usize {
    50
}

fn default_key_field() -> String {
    DEFAULT_KEY_FIELD.to_string()
}
