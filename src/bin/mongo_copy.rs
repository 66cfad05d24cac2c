use clap::Parser;
use mongo_copy::{copier, Connection, CopyConf, CopyJob, RunError};
use std::path::Path;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[clap(version = env!("CARGO_PKG_VERSION"), author = env!("CARGO_PKG_AUTHORS"))]
struct Opts {
    /// configuration file path, command line options take precedence over it.
    #[clap(short, long)]
    conf: Option<String>,
    /// number of copy worker threads.
    #[clap(short, long)]
    threads: Option<usize>,
    /// documents per insert batch.
    #[clap(short, long)]
    batch_size: Option<usize>,
    /// string field used as document key.
    #[clap(long)]
    key_field: Option<String>,
    /// log file path, if not specified, all log information will be output to stdout.
    #[clap(long)]
    log_path: Option<String>,

    /// source host name.
    #[clap(long)]
    src_host: Option<String>,
    /// source port number.
    #[clap(long)]
    src_port: Option<u16>,
    /// source user name.
    #[clap(long)]
    src_user: Option<String>,
    /// source password.
    #[clap(long)]
    src_password: Option<String>,
    /// connect to source with TLS, `true` or `false`.
    #[clap(long, value_name = "BOOL")]
    src_tls: Option<bool>,
    /// source path to the CA certificate.
    #[clap(long)]
    src_ca_cert: Option<String>,
    /// source database name.
    #[clap(long)]
    src_db: Option<String>,
    /// source collection name.
    #[clap(long)]
    src_coll: Option<String>,

    /// destination host name.
    #[clap(long)]
    dst_host: Option<String>,
    /// destination port number.
    #[clap(long)]
    dst_port: Option<u16>,
    /// destination user name.
    #[clap(long)]
    dst_user: Option<String>,
    /// destination password.
    #[clap(long)]
    dst_password: Option<String>,
    /// connect to destination with TLS, `true` or `false`.
    #[clap(long, value_name = "BOOL")]
    dst_tls: Option<bool>,
    /// destination path to the CA certificate.
    #[clap(long)]
    dst_ca_cert: Option<String>,
    /// destination database name.
    #[clap(long)]
    dst_db: Option<String>,
    /// destination collection name.
    #[clap(long)]
    dst_coll: Option<String>,
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

impl Opts {
    fn apply_to(self, conf: &mut CopyConf) {
        set(&mut conf.copy.threads, self.threads);
        set(&mut conf.copy.batch_size, self.batch_size);
        set(&mut conf.copy.key_field, self.key_field);

        set(&mut conf.src.host, self.src_host);
        set(&mut conf.src.port, self.src_port);
        set(&mut conf.src.user, self.src_user);
        set(&mut conf.src.password, self.src_password);
        set(&mut conf.src.tls, self.src_tls);
        set(&mut conf.src.ca_cert_path, self.src_ca_cert);
        set(&mut conf.src.db, self.src_db);
        set(&mut conf.src.coll, self.src_coll);

        set(&mut conf.dst.host, self.dst_host);
        set(&mut conf.dst.port, self.dst_port);
        set(&mut conf.dst.user, self.dst_user);
        set(&mut conf.dst.password, self.dst_password);
        set(&mut conf.dst.tls, self.dst_tls);
        set(&mut conf.dst.ca_cert_path, self.dst_ca_cert);
        set(&mut conf.dst.db, self.dst_db);
        set(&mut conf.dst.coll, self.dst_coll);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts: Opts = Opts::parse();
    let collector = tracing_subscriber::fmt();
    let (non_blocking, _guard) = match &opts.log_path {
        Some(path) => {
            let path = Path::new(path);
            let dir_name = path.parent().unwrap_or_else(|| Path::new("."));
            let file_name = path.file_name().ok_or("log path must name a file")?;
            let file_appender = tracing_appender::rolling::daily(dir_name, file_name);
            tracing_appender::non_blocking(file_appender)
        }
        None => tracing_appender::non_blocking(std::io::stdout()),
    };
    collector.with_writer(non_blocking).init();

    let mut conf = match &opts.conf {
        Some(path) => CopyConf::from_path(path)?,
        None => CopyConf::default(),
    };
    opts.apply_to(&mut conf);

    if let Err(e) = copy(&conf) {
        report_failure(&e);
        return Err(e.into());
    }
    Ok(())
}

fn copy(conf: &CopyConf) -> Result<(), RunError> {
    info!(
        src = %conf.src.address(),
        src_ns = %format!("{}.{}", conf.src.db, conf.src.coll),
        dst = %conf.dst.address(),
        dst_ns = %format!("{}.{}", conf.dst.db, conf.dst.coll),
        threads = conf.copy.threads,
        batch_size = conf.copy.batch_size,
        "Use the following config to copy collection."
    );

    let src = Connection::new(&conf.src)?;
    let version = src.server_version()?;
    info!(host = %conf.src.address(), %version, "Connected to source mongodb.");
    src.check_permission()?;

    let dst = Connection::new(&conf.dst)?;
    let version = dst.server_version()?;
    info!(host = %conf.dst.address(), %version, "Connected to destination mongodb.");
    dst.recreate_collection()?;

    let key_field = conf.copy.key_field.as_str();
    let job = CopyJob::from_conf(conf);
    let summary = copier::run(&src.store(key_field), &dst.store(key_field), &job)?;
    println!("{}", summary);
    Ok(())
}

fn report_failure(e: &RunError) {
    if let RunError::PartialCopy {
        partitions,
        documents_copied,
        failures,
    } = e
    {
        for failure in failures {
            error!(
                partition = failure.partition,
                op = %failure.op,
                cause = ?failure.source,
                "Partition was not fully copied."
            );
        }
        error!(
            partitions,
            failed = failures.len(),
            documents_copied,
            "Copy failed, destination collection is incomplete."
        );
    } else {
        error!(error = ?e, "Copy failed.");
    }
}
