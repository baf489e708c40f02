use std::path::PathBuf;
use tracklist::model::Settings;

#[derive(Debug, Default)]
struct CliArgs {
    songs: Option<PathBuf>,
    manifest: Option<PathBuf>,
    scan: bool,
    restart_previous: Option<u16>,
    no_covers: bool,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;
    run(&args)
}

fn run(args: &CliArgs) -> anyhow::Result<()> {
    let settings = apply_args(tracklist::config::load_settings()?, args);

    if args.scan {
        let entries = tracklist::library::scan_manifest(&settings.songs_dir);
        let manifest = settings.manifest_path();
        tracklist::library::write_manifest(&manifest, &entries)?;
        println!("Wrote {} songs to {}", entries.len(), manifest.display());
        return Ok(());
    }

    let log_dir = tracklist::config::ensure_config_dir()?;
    if let Err(err) = tracklist::logging::init(&log_dir) {
        eprintln!("logging disabled: {err:#}");
    }
    tracklist::app::run(settings)
}

fn apply_args(mut settings: Settings, args: &CliArgs) -> Settings {
    if let Some(songs) = &args.songs {
        settings.songs_dir = songs.clone();
    }
    if let Some(manifest) = &args.manifest {
        settings.manifest = Some(manifest.clone());
    }
    if let Some(seconds) = args.restart_previous {
        settings.restart_previous_after_seconds = Some(seconds);
    }
    if args.no_covers {
        settings.extract_cover_art = false;
    }
    settings
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--songs" => out.songs = Some(PathBuf::from(required_value(&args, &mut index)?)),
            "--manifest" => {
                out.manifest = Some(PathBuf::from(required_value(&args, &mut index)?));
            }
            "--restart-previous" => {
                let raw = required_value(&args, &mut index)?;
                let seconds = raw
                    .parse::<u16>()
                    .map_err(|_| anyhow::anyhow!("--restart-previous expects seconds, got {raw}"))?;
                out.restart_previous = Some(seconds);
            }
            "--scan" => out.scan = true,
            "--no-covers" => out.no_covers = true,
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn required_value<'a>(args: &'a [String], index: &mut usize) -> anyhow::Result<&'a str> {
    let flag = &args[*index];
    *index += 1;
    let Some(value) = args.get(*index) else {
        anyhow::bail!("{flag} requires a value");
    };
    if value.trim().is_empty() {
        anyhow::bail!("{flag} cannot be empty");
    }
    Ok(value.trim())
}

fn print_help() {
    println!("tracklist");
    println!("  --songs <dir>               Folder the manifest's file names are relative to");
    println!("  --manifest <file>           Song list (default <songs>/songs.json)");
    println!("  --scan                      Write a manifest for every song under --songs and exit");
    println!("  --restart-previous <secs>   Previous restarts the song once it has played this long");
    println!("  --no-covers                 Skip embedded cover art");
}
