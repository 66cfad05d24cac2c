use super::mongo_store::MongoStore;
use crate::config::ConnSettings;
use crate::error::{Result, RunError};
use crate::ADMIN_DB_NAME;
use bson::{doc, Document};
use mongodb::error::Error as MongoError;
use mongodb::options::{ClientOptions, Credential, ServerAddress, Tls, TlsOptions};
use mongodb::sync::{Client, Collection, Database};
use std::path::PathBuf;
use tracing::info;

#[derive(Clone, Debug)]
/// A connection to one mongodb instance, bound to the database and collection named in its settings.
pub struct Connection {
    client: Client,
    settings: ConnSettings,
}

impl Connection {
    /// create a new connection from given `settings`.
    ///
    /// The driver connects lazily, use [server_version](Connection::server_version) to make sure
    /// the server is reachable.
    pub fn new(settings: &ConnSettings) -> Result<Connection> {
        let client = Client::with_options(client_options(settings)?).map_err(|detail| {
            RunError::Connect {
                host: settings.address(),
                detail,
            }
        })?;
        Ok(Connection {
            client,
            settings: settings.clone(),
        })
    }

    /// ask server for its version.
    pub fn server_version(&self) -> Result<String> {
        let connect_error = |detail| RunError::Connect {
            host: self.settings.address(),
            detail,
        };
        let info = self
            .client
            .database(ADMIN_DB_NAME)
            .run_command(doc! {"buildInfo": 1}, None)
            .map_err(connect_error)?;
        Ok(info.get_str("version").unwrap_or("unknown").to_string())
    }

    /// Check if we have enough permissions to read the configured database.
    pub fn check_permission(&self) -> Result<()> {
        if let Err(e) = self.get_db().list_collection_names(None) {
            return Err(RunError::PermissionError {
                host: self.settings.address(),
                db: self.settings.db.clone(),
                detail: e,
            });
        }
        Ok(())
    }

    /// Make sure the configured database exists, and replace the configured collection with an
    /// empty one.
    pub fn recreate_collection(&self) -> Result<()> {
        let (db_name, coll_name) = (&self.settings.db, &self.settings.coll);
        let db_exists = self
            .client
            .list_database_names(None, None)
            .map_err(|e| self.provision_error(e))?
            .iter()
            .any(|name| name == db_name);

        let db = self.get_db();
        let coll_exists = db_exists
            && db
                .list_collection_names(None)
                .map_err(|e| self.provision_error(e))?
                .iter()
                .any(|name| name == coll_name);
        if coll_exists {
            self.get_coll().drop(None).map_err(|e| self.provision_error(e))?;
            info!(%db_name, %coll_name, "Collection dropped.");
        }

        // mongodb creates the database along with its first collection.
        db.create_collection(coll_name, None)
            .map_err(|e| self.provision_error(e))?;
        if !db_exists {
            info!(%db_name, "Database created.");
        }
        info!(%db_name, %coll_name, "Collection created.");
        Ok(())
    }

    /// get configured database.
    pub fn get_db(&self) -> Database {
        self.client.database(&self.settings.db)
    }

    /// get configured collection.
    pub fn get_coll(&self) -> Collection<Document> {
        self.get_db().collection(&self.settings.coll)
    }

    /// key ordered store over the configured database, documents are keyed by `key_field`.
    pub fn store(&self, key_field: &str) -> MongoStore {
        MongoStore::new(self.get_db(), key_field)
    }

    /// get connection settings.
    pub fn get_settings(&self) -> &ConnSettings {
        &self.settings
    }

    fn provision_error(&self, detail: MongoError) -> RunError {
        RunError::Provision {
            coll: format!("{}.{}", self.settings.db, self.settings.coll),
            detail,
        }
    }
}

fn client_options(settings: &ConnSettings) -> Result<ClientOptions> {
    let connect_error = |detail| RunError::Connect {
        host: settings.address(),
        detail,
    };
    let address = ServerAddress::parse(settings.address()).map_err(connect_error)?;

    let credential = if settings.user.is_empty() {
        None
    } else {
        Some(
            Credential::builder()
                .username(settings.user.clone())
                .password(settings.password.clone())
                .build(),
        )
    };

    let tls = if settings.tls {
        let ca_file_path = if settings.ca_cert_path.is_empty() {
            None
        } else {
            Some(PathBuf::from(&settings.ca_cert_path))
        };
        Some(Tls::Enabled(
            TlsOptions::builder().ca_file_path(ca_file_path).build(),
        ))
    } else {
        None
    };

    Ok(ClientOptions::builder()
        .hosts(vec![address])
        .credential(credential)
        .tls(tls)
        .app_name("mongo_copy".to_string())
        .build())
}
