use anyhow::{Context, Result as AnyhowResult};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fresh_syntaxes::config::RegistryConfig;
use fresh_syntaxes::config_io::DirectoryContext;
use fresh_syntaxes::model::filesystem::{FileSystem, StdFileSystem};
use fresh_syntaxes::registry::{codec, BundledLayer, MappingKind, SyntaxRegistry};
use fresh_syntaxes::services::tracing_setup;

/// Inspect the syntax definitions known to the Fresh editor
#[derive(Parser, Debug)]
#[command(name = "fresh-syntaxes")]
#[command(about = "List, detect and inspect syntax definitions", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Directory with user syntax files (default: <config dir>/syntaxes)
    #[arg(long, value_name = "PATH", global = true)]
    user_dir: Option<PathBuf>,

    /// Directory with SyntaxMap.json and bundled syntax files (default: built-in bundle)
    #[arg(long, value_name = "PATH", global = true)]
    bundle_dir: Option<PathBuf>,

    /// Path to log file (default: stderr, filtered by RUST_LOG)
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every known syntax name
    List,
    /// Print the syntax detected for a file
    Detect {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print the resolved definition of a syntax as YAML
    Show {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Print tokens claimed by more than one syntax
    Conflicts,
    /// Print the JSON Schema of the registry config file
    Schema,
}

fn open_registry(args: &Args) -> AnyhowResult<SyntaxRegistry> {
    // System directories are only required when no user dir is given
    let dir_context = DirectoryContext::from_system();
    let fs: Arc<dyn FileSystem> = Arc::new(StdFileSystem);

    let bundled = match &args.bundle_dir {
        Some(dir) => BundledLayer::from_dir(fs.as_ref(), dir)
            .with_context(|| format!("Failed to load bundle from {}", dir.display()))?,
        None => BundledLayer::embedded().context("Failed to load built-in bundle")?,
    };
    let user_dir = user_syntaxes_dir(args.user_dir.as_deref(), &dir_context)?;
    let config = match &dir_context {
        Ok(dir_context) => RegistryConfig::load_or_default(dir_context.registry_config_path()),
        Err(e) => {
            tracing::warn!("No config directory ({}), using default registry config", e);
            RegistryConfig::default()
        }
    };

    Ok(SyntaxRegistry::new(fs, bundled, user_dir, &config))
}

/// `--user-dir` when given, the system syntaxes directory otherwise.
fn user_syntaxes_dir(
    user_dir: Option<&Path>,
    dir_context: &std::io::Result<DirectoryContext>,
) -> AnyhowResult<PathBuf> {
    match (user_dir, dir_context) {
        (Some(dir), _) => Ok(dir.to_path_buf()),
        (None, Ok(dir_context)) => Ok(dir_context.syntaxes_dir()),
        (None, Err(e)) => anyhow::bail!(
            "Failed to locate the user syntaxes directory ({}); pass --user-dir",
            e
        ),
    }
}

fn list(registry: &SyntaxRegistry) {
    for name in registry.setting_names() {
        let state = registry.state_of(&name);
        let origin = match (state.is_bundled, state.is_customized) {
            (true, true) => "bundled, customized",
            (true, false) => "bundled",
            _ => "user",
        };
        println!("{name}\t({origin})");
    }
    for path in registry.skipped_user_files() {
        eprintln!("warning: skipped unreadable syntax file {}", path.display());
    }
}

fn detect(registry: &SyntaxRegistry, file: &Path) -> AnyhowResult<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let content = String::from_utf8_lossy(&bytes);
    let filename = file.to_string_lossy();

    match registry.resolve_by_document(&filename, &content) {
        Some(name) => println!("{name}"),
        None => println!("{}", fresh_syntaxes::registry::NONE_NAME),
    }
    Ok(())
}

fn show(registry: &SyntaxRegistry, name: &str) -> AnyhowResult<()> {
    let definition = registry.resolve_by_name(name)?;
    let bytes = codec::serialize_definition(&definition)?;
    print!("{}", String::from_utf8_lossy(&bytes));
    Ok(())
}

fn conflicts(registry: &SyntaxRegistry) {
    let conflicts = registry.mapping_conflicts();
    if conflicts.is_empty() {
        println!("No conflicts");
        return;
    }
    println!("{} syntaxes involved", conflicts.names().len());
    for kind in MappingKind::ALL {
        let label = match kind {
            MappingKind::Extension => "extension",
            MappingKind::Filename => "filename",
            MappingKind::Interpreter => "interpreter",
        };
        for (token, names) in conflicts.get(kind) {
            println!("{label} {token}: {}", names.join(", "));
        }
    }
}

fn main() -> AnyhowResult<()> {
    let args = Args::parse();

    tracing_setup::init_global(args.log_file.as_deref());

    // Handle schema early (no registry needed)
    if matches!(args.command, Command::Schema) {
        let schema = serde_json::to_string_pretty(&RegistryConfig::json_schema())
            .context("Failed to serialize schema")?;
        println!("{schema}");
        return Ok(());
    }

    let registry = open_registry(&args)?;
    tracing::debug!("Registry opened at {}", registry.user_dir().display());

    match &args.command {
        Command::List => list(&registry),
        Command::Detect { file } => detect(&registry, file)?,
        Command::Show { name } => show(&registry, name)?,
        Command::Conflicts => conflicts(&registry),
        Command::Schema => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_dirs() -> std::io::Result<DirectoryContext> {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine config directory",
        ))
    }

    #[test]
    fn test_explicit_user_dir_needs_no_system_dirs() {
        let dir = user_syntaxes_dir(Some(Path::new("/tmp/syntaxes")), &missing_dirs()).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/syntaxes"));
    }

    #[test]
    fn test_default_user_dir_comes_from_context() {
        let temp_dir = tempfile::tempdir().unwrap();
        let context = Ok(DirectoryContext::for_testing(temp_dir.path()));
        assert_eq!(
            user_syntaxes_dir(None, &context).unwrap(),
            temp_dir.path().join("config").join("syntaxes")
        );
        assert!(user_syntaxes_dir(None, &missing_dirs()).is_err());
    }
}
