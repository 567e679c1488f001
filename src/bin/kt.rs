use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[macro_use]
extern crate log;

use argh::FromArgs;
use rsa::RsaPublicKey;

use kt::assemble::{self, CreateKind, CreateParams};
use kt::convert;
use kt::{Context, Error};
use update_format_kindle::obfuscate::{DeobfuscatingReader, ObfuscatingReader};
use update_format_kindle::sign::{self, CertNumber};

#[derive(FromArgs, Debug)]
/// Package, sign, inspect and unpack e-reader firmware update bundles.
struct Args {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
enum Command {
    Convert(ConvertArgs),
    Extract(ExtractArgs),
    Create(CreateArgs),
    Info(InfoArgs),
    Munge(MungeArgs),
    Demunge(DemungeArgs),
}

#[derive(FromArgs, Debug)]
/// disassemble a bundle into a directory, or a tar.gz with -c
#[argh(subcommand, name = "convert")]
struct ConvertArgs {
    /// the bundle to disassemble
    #[argh(positional)]
    input: PathBuf,

    /// private or public key for signature checks
    #[argh(option, short = 'k')]
    key: Option<PathBuf>,

    /// output path (file with -c, directory without)
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,

    /// write a single tar.gz instead of extracting to a directory
    #[argh(switch, short = 'c')]
    compress: bool,

    /// skip signature verification
    #[argh(switch, short = 'w')]
    without_verify: bool,
}

#[derive(FromArgs, Debug)]
/// explode a bundle's payload into a directory
#[argh(subcommand, name = "extract")]
struct ExtractArgs {
    /// the bundle to disassemble
    #[argh(positional)]
    input: PathBuf,

    /// the directory to extract into
    #[argh(positional)]
    outdir: PathBuf,

    /// private or public key for signature checks
    #[argh(option, short = 'k')]
    key: Option<PathBuf>,

    /// skip signature verification
    #[argh(switch, short = 'w')]
    without_verify: bool,
}

#[derive(FromArgs, Debug)]
/// assemble a bundle from payload files
#[argh(subcommand, name = "create")]
struct CreateArgs {
    /// bundle kind: ota, ota2, ota_update_data, recovery, recovery2, sig, userdata, android
    #[argh(positional)]
    kind: String,

    /// target device code.
    /// may be specified multiple times.
    #[argh(option, short = 'd')]
    device: Vec<String>,

    /// private key for signing
    #[argh(option, short = 'k')]
    key: Option<PathBuf>,

    /// source revision
    #[argh(option, short = 's', default = "0")]
    source: u64,

    /// target revision
    #[argh(option, short = 't', default = "0")]
    target: u64,

    /// minor revision
    #[argh(option, short = 'm', default = "0")]
    minor: u8,

    /// target platform (name or number)
    #[argh(option, short = 'p')]
    platform: Option<String>,

    /// target board (name or number)
    #[argh(option, short = 'b')]
    board: Option<String>,

    /// certificate number: 0 = dev, 1 = official 1K, 2 = official 2K
    #[argh(option, short = 'c', default = "0")]
    cert: u8,

    /// mark the update as optional
    #[argh(switch, short = 'O')]
    optional: bool,

    /// metadata record, key=value.
    /// may be specified multiple times.
    #[argh(option, short = 'x')]
    meta: Vec<String>,

    /// legacy source revision
    #[argh(option, short = 'r')]
    legacy_source: Option<u32>,

    /// input files or directories, followed by the output bundle path
    #[argh(positional)]
    files: Vec<PathBuf>,
}

#[derive(FromArgs, Debug)]
/// print a bundle's header description
#[argh(subcommand, name = "info")]
struct InfoArgs {
    /// the bundle to inspect
    #[argh(positional)]
    input: PathBuf,
}

#[derive(FromArgs, Debug)]
/// obfuscate a file
#[argh(subcommand, name = "md")]
struct MungeArgs {
    /// the file to obfuscate
    #[argh(positional)]
    input: PathBuf,

    /// where to write the obfuscated bytes
    #[argh(positional)]
    output: PathBuf,
}

#[derive(FromArgs, Debug)]
/// deobfuscate a file
#[argh(subcommand, name = "dm")]
struct DemungeArgs {
    /// the file to deobfuscate
    #[argh(positional)]
    input: PathBuf,

    /// where to write the plain bytes
    #[argh(positional)]
    output: PathBuf,
}

fn main() {
    env_logger::init();

    let args: Args = argh::from_env();
    let ctx = Context::from_env();

    if let Err(err) = run(&ctx, args.command) {
        eprintln!("kt: {err}");
        std::process::exit(err.exit_code());
    }
}

fn run(ctx: &Context, command: Command) -> kt::Result<()> {
    match command {
        Command::Convert(args) => run_convert(ctx, args),
        Command::Extract(args) => run_extract(ctx, args),
        Command::Create(args) => run_create(ctx, args),
        Command::Info(args) => {
            print!("{}", convert::info(&args.input)?);
            Ok(())
        }
        Command::Munge(args) => transform_file(&args.input, &args.output, true),
        Command::Demunge(args) => transform_file(&args.input, &args.output, false),
    }
}

fn run_convert(ctx: &Context, args: ConvertArgs) -> kt::Result<()> {
    let verify = load_verify_key(args.key.as_deref(), args.without_verify)?;
    if args.compress {
        let out = convert::convert(ctx, &args.input, args.output.as_deref(), verify.as_ref())?;
        println!("{}", out.display());
    } else {
        let outdir = match args.output {
            Some(dir) => dir,
            None => args.input.with_extension(""),
        };
        convert::extract(ctx, &args.input, &outdir, verify.as_ref())?;
    }
    Ok(())
}

fn run_extract(ctx: &Context, args: ExtractArgs) -> kt::Result<()> {
    let verify = load_verify_key(args.key.as_deref(), args.without_verify)?;
    convert::extract(ctx, &args.input, &args.outdir, verify.as_ref())
}

fn run_create(ctx: &Context, args: CreateArgs) -> kt::Result<()> {
    let kind = CreateKind::from_str(&args.kind)?;

    if args.files.len() < 2 {
        return Err(Error::Usage("create needs input files and an output path".to_string()));
    }
    let (output, inputs) = args.files.split_last().expect("checked above");

    let mut device_codes = Vec::with_capacity(args.device.len());
    for token in &args.device {
        let code = devices::decode_device(token, ctx.accept_unknown_devcodes)?;
        if ctx.accept_unknown_devcodes && !devices::is_known_device(code) {
            warn!("device code {token} (0x{code:X}) is not in the device table");
        }
        device_codes.push(code);
    }

    for record in &args.meta {
        if !record.contains('=') {
            return Err(Error::Usage(format!("metadata record {record:?} is not key=value")));
        }
    }

    let cert = CertNumber::try_from(args.cert).map_err(|_| Error::Usage(format!("bad certificate number: {}", args.cert)))?;
    let platform = match &args.platform {
        Some(token) => Some(devices::parse_platform(token).map_err(|err| Error::Usage(err.to_string()))?),
        None => None,
    };
    let board = match &args.board {
        Some(token) => Some(devices::parse_board(token).map_err(|err| Error::Usage(err.to_string()))?),
        None => None,
    };
    let signing_key = args.key.as_deref().map(sign::load_private_key).transpose()?;

    let params = CreateParams {
        kind,
        devices: device_codes,
        signing_key,
        source_revision: args.source,
        target_revision: args.target,
        legacy_source_revision: args.legacy_source,
        minor: args.minor,
        platform,
        board,
        cert,
        optional: args.optional,
        metadata: args.meta,
    };

    assemble::create(ctx, &params, inputs, output)
}

fn load_verify_key(path: Option<&Path>, skip: bool) -> kt::Result<Option<RsaPublicKey>> {
    if skip {
        if path.is_some() {
            warn!("-w given, ignoring the supplied key");
        }
        return Ok(None);
    }
    Ok(path.map(sign::load_verification_key).transpose()?)
}

fn transform_file(input: &Path, output: &Path, forward: bool) -> kt::Result<()> {
    let source = File::open(input).map_err(|err| Error::Io(format!("failed to open {}", input.display()), err))?;
    let sink = File::create(output).map_err(|err| Error::Io(format!("failed to create {}", output.display()), err))?;
    let mut writer = BufWriter::new(sink);

    let copied = if forward {
        io::copy(&mut ObfuscatingReader::new(BufReader::new(source)), &mut writer)
    } else {
        io::copy(&mut DeobfuscatingReader::new(BufReader::new(source)), &mut writer)
    };
    copied.map_err(|err| Error::Io(format!("failed to transform {}", input.display()), err))?;
    writer.flush().map_err(|err| Error::Io(format!("failed to write {}", output.display()), err))?;
    Ok(())
}
