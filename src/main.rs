#![cfg(feature = "cli")]
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};

use rsdtcpip::buffer::Buffer;
use rsdtcpip::caps::Caps;
use rsdtcpip::config::{Settings, PROPERTIES};
use rsdtcpip::element::{DtcpIpDec, METADATA};
use rsdtcpip::loopback::LoopbackLibrary;
use rsdtcpip::pad::{Downstream, Filter, FlowError, FlowResult};
use rsdtcpip::runtime::Runtime;
use rsdtcpip::state::State;
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "rsdtcpip", version, disable_version_flag = true, about = "rsdtcpip CLI")]
struct Cli {
    #[arg(short = 'v', long = "version", action = ArgAction::SetTrue)]
    version: bool,

    #[arg(short = 'd', long = "debug", action = ArgAction::SetTrue)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// CLI subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Print the element description, pad templates and properties.
    Inspect,
    /// Push a file through the element and write what comes out.
    ///
    /// Uses the loopback library, which runs the full lifecycle but does not
    /// perform AKE or decryption: output equals input.
    Run {
        input: PathBuf,
        output: PathBuf,
        /// YAML file with dtcp1host, dtcp1port and dtcpip_storage.
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
        /// Property assignment, e.g. `dtcp1host=10.4.19.241`. Repeatable.
        #[arg(short = 's', long = "set")]
        set: Vec<String>,
        /// Bytes per pushed buffer.
        #[arg(short = 'b', long = "blocksize", default_value = "4096")]
        blocksize: usize,
        /// Caps announced on the input side.
        #[arg(long = "caps", default_value = "application/x-dtcp1")]
        caps: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug {
        Level::TRACE
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    info!("rsdtcpip version {}", env!("CARGO_PKG_VERSION"));

    if cli.version {
        return Ok(());
    }

    match cli.command {
        Some(Commands::Inspect) => run_inspect(),
        Some(Commands::Run {
            input,
            output,
            config,
            set,
            blocksize,
            caps,
        }) => run_file(&input, &output, config.as_deref(), &set, blocksize, &caps),
        None => Ok(()),
    }
}

fn run_inspect() -> anyhow::Result<()> {
    let defaults = Settings::default();

    println!("Factory Details:");
    println!("  Name: {}", METADATA.factory_name);
    println!("  Long-name: {}", METADATA.long_name);
    println!("  Klass: {}", METADATA.klass);
    println!("  Description: {}", METADATA.description);
    println!();
    println!("Pad Templates:");
    println!("  SRC template: 'src'");
    println!("    Capabilities: {}", METADATA.src_template);
    println!("  SINK template: 'sink'");
    println!("    Capabilities: {}", METADATA.sink_template);
    println!();
    println!("Element Properties:");
    for spec in PROPERTIES {
        let default = defaults.property(spec.name)?;
        println!("  {:<16}: {}", spec.name, spec.blurb);
        println!("  {:<16}  {:?}. Default: {}", "", spec.value_type, default);
    }
    Ok(())
}

fn run_file(
    input: &Path,
    output: &Path,
    config: Option<&Path>,
    assignments: &[String],
    blocksize: usize,
    caps: &str,
) -> anyhow::Result<()> {
    if blocksize == 0 {
        anyhow::bail!("Block size must be positive");
    }

    let settings = match config {
        Some(path) => Settings::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Settings::default(),
    };

    let mut reader = File::open(input)
        .with_context(|| format!("Failed to open input {}", input.display()))?;
    let writer = File::create(output)
        .with_context(|| format!("Failed to create output {}", output.display()))?;

    let runtime = Runtime::new(LoopbackLibrary::new());
    let mut element = DtcpIpDec::with_settings(runtime, settings);
    for assignment in assignments {
        element.set_property_from_str(assignment)?;
    }
    element.link(FileSink::new(writer));
    element.accept_upstream_caps(Caps::new(caps))?;

    element
        .set_state(State::Playing)
        .context("Failed to activate dtcpip")?;
    info!(
        "[+] Opened session {} with {}:{}",
        element.session_handle(),
        element.peer_host(),
        element.peer_port()
    );

    let mut chunk = vec![0u8; blocksize];
    let flow = loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break Ok(());
        }
        if let Err(err) = element.push_buffer(Buffer::from_vec(chunk[..read].to_vec())) {
            break Err(err);
        }
    };

    // Always tear down, even when the stream broke.
    element.set_state(State::Null)?;

    let stats = element.stats();
    if let Err(flow) = flow {
        error!("[-] Stream stopped: {}", flow);
        anyhow::bail!("Data flow error: {}", flow);
    }
    if let Some(sink) = element.downstream_mut() {
        sink.finish()?;
    }

    info!(
        "[+] Decrypted {} buffers, {} -> {} bytes",
        stats.buffers,
        stats.encrypted_bytes,
        stats.cleartext_bytes
    );
    Ok(())
}

/// Downstream writing buffers to a file.
struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    fn new(file: File) -> Self {
        Self {
            writer: BufWriter::new(file),
        }
    }

    fn finish(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl Downstream for FileSink {
    fn set_caps(&mut self, caps: &Caps) -> bool {
        info!("Output caps: {}", caps);
        true
    }

    fn push(&mut self, buffer: Buffer) -> FlowResult {
        self.writer.write_all(&buffer).map_err(|err| {
            error!("Failed to write {} bytes: {}", buffer.len(), err);
            FlowError::Error
        })
    }
}
