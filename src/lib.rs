pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod controller;
pub mod doctor;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod runtime;
pub mod stage;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;

use clap::Parser;

use crate::bootstrap::AppPaths;
use crate::cli::{Cli, Command};
use crate::config::{load_config, AppConfig};
use crate::error::AppResult;
use crate::pipeline::{InputType, SourceMaterial};
use crate::runtime::{doctor_report, fetch_artifact, run_entry, status_report, EntryRequest};

trait CommandExecutor {
    fn process(&self, config: &AppConfig, request: EntryRequest) -> AppResult<()>;
    fn fetch(&self, config: &AppConfig, reference: &str, out: Option<PathBuf>) -> AppResult<()>;
    fn doctor(&self, config: &AppConfig, json: bool) -> AppResult<()>;
    fn status(&self, paths: &AppPaths, config: &AppConfig) -> AppResult<()>;
}

struct DefaultCommandExecutor;

impl CommandExecutor for DefaultCommandExecutor {
    fn process(&self, config: &AppConfig, request: EntryRequest) -> AppResult<()> {
        run_entry(config, request)
    }

    fn fetch(&self, config: &AppConfig, reference: &str, out: Option<PathBuf>) -> AppResult<()> {
        let written = fetch_artifact(config, reference, out)?;
        println!("{}", written.display());
        Ok(())
    }

    fn doctor(&self, config: &AppConfig, json: bool) -> AppResult<()> {
        let report = doctor_report(config)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("{}", report.render_text());
        }
        Ok(())
    }

    fn status(&self, paths: &AppPaths, config: &AppConfig) -> AppResult<()> {
        let report = status_report(config, paths)?;
        println!("{report}");
        Ok(())
    }
}

fn entry_request(command: &Command) -> Option<EntryRequest> {
    let (input_type, source, download) = match command {
        Command::Video { path, download } => (
            InputType::Video,
            SourceMaterial::File(path.clone()),
            download.download,
        ),
        Command::Audio { path, download } => (
            InputType::Audio,
            SourceMaterial::File(path.clone()),
            download.download,
        ),
        Command::Text {
            text,
            file,
            download,
        } => {
            let source = match (text, file) {
                (_, Some(path)) => SourceMaterial::File(path.clone()),
                (Some(text), None) => SourceMaterial::PastedText(text.clone()),
                (None, None) => SourceMaterial::PastedText(String::new()),
            };
            (InputType::Text, source, download.download)
        }
        Command::Youtube { url, download } => (
            InputType::Youtube,
            SourceMaterial::Url(url.clone()),
            download.download,
        ),
        Command::Fetch { .. } | Command::Doctor { .. } | Command::Status => return None,
    };

    Some(EntryRequest {
        input_type,
        source,
        download,
    })
}

fn execute_command<E: CommandExecutor>(
    command: Command,
    paths: AppPaths,
    config: AppConfig,
    executor: &E,
) -> AppResult<()> {
    if let Some(request) = entry_request(&command) {
        return executor.process(&config, request);
    }

    match command {
        Command::Fetch { reference, out } => executor.fetch(&config, &reference, out),
        Command::Doctor { json } => executor.doctor(&config, json),
        Command::Status => executor.status(&paths, &config),
        _ => Ok(()),
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.diagnostics.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact()
        .init();
}

pub fn run() -> AppResult<()> {
    let cli = Cli::parse();

    let paths = AppPaths::resolve()?;
    paths.ensure_dirs()?;

    let config = load_config(&paths, &cli.to_overrides())?;
    init_tracing(&config);

    execute_command(cli.command, paths, config, &DefaultCommandExecutor)
}

#[cfg(test)]
mod tests {
    use super::{entry_request, execute_command, CommandExecutor};
    use crate::bootstrap::paths::AppPaths;
    use crate::cli::{Command, DownloadArgs};
    use crate::config::schema::AppConfig;
    use crate::error::AppResult;
    use crate::pipeline::{InputType, SourceMaterial};
    use crate::runtime::EntryRequest;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct SpyExecutor {
        calls: Mutex<Vec<String>>,
    }

    impl SpyExecutor {
        fn push(&self, call: String) {
            self.calls.lock().expect("lock calls").push(call);
        }
    }

    impl CommandExecutor for SpyExecutor {
        fn process(&self, _config: &AppConfig, request: EntryRequest) -> AppResult<()> {
            self.push(format!(
                "process:{}:{}",
                request.input_type.label(),
                request.download
            ));
            Ok(())
        }

        fn fetch(&self, _config: &AppConfig, reference: &str, _out: Option<PathBuf>) -> AppResult<()> {
            self.push(format!("fetch:{reference}"));
            Ok(())
        }

        fn doctor(&self, _config: &AppConfig, json: bool) -> AppResult<()> {
            self.push(format!("doctor:{json}"));
            Ok(())
        }

        fn status(&self, _paths: &AppPaths, _config: &AppConfig) -> AppResult<()> {
            self.push("status".to_owned());
            Ok(())
        }
    }

    fn sample_paths(root: &std::path::Path) -> AppPaths {
        AppPaths {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
            cache_dir: root.join("cache"),
            config_file: root.join("config/config.toml"),
            downloads_dir: root.join("data/downloads"),
        }
    }

    fn no_download() -> DownloadArgs {
        DownloadArgs { download: false }
    }

    #[test]
    fn command_dispatch_routes_entry_fetch_doctor_and_status() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let paths = sample_paths(temp.path());
        let config = AppConfig::default();
        let executor = SpyExecutor::default();

        let commands = [
            Command::Youtube {
                url: "https://youtu.be/abc".to_owned(),
                download: DownloadArgs { download: true },
            },
            Command::Fetch {
                reference: "out/summary.mp3".to_owned(),
                out: None,
            },
            Command::Doctor { json: true },
            Command::Status,
        ];
        for command in commands {
            execute_command(command, paths.clone(), config.clone(), &executor).expect("dispatch");
        }

        assert_eq!(
            executor.calls.lock().expect("lock calls").as_slice(),
            [
                "process:youtube:true",
                "fetch:out/summary.mp3",
                "doctor:true",
                "status"
            ]
        );
    }

    #[test]
    fn entry_commands_map_to_source_material() {
        let video = entry_request(&Command::Video {
            path: PathBuf::from("talk.mp4"),
            download: no_download(),
        })
        .expect("video request");
        assert_eq!(video.input_type, InputType::Video);
        assert_eq!(video.source, SourceMaterial::File(PathBuf::from("talk.mp4")));

        let pasted = entry_request(&Command::Text {
            text: Some("hello world".to_owned()),
            file: None,
            download: no_download(),
        })
        .expect("text request");
        assert_eq!(pasted.input_type, InputType::Text);
        assert_eq!(
            pasted.source,
            SourceMaterial::PastedText("hello world".to_owned())
        );

        let from_file = entry_request(&Command::Text {
            text: None,
            file: Some(PathBuf::from("notes.txt")),
            download: no_download(),
        })
        .expect("file request");
        assert_eq!(from_file.source, SourceMaterial::File(PathBuf::from("notes.txt")));

        assert!(entry_request(&Command::Status).is_none());
        assert!(entry_request(&Command::Doctor { json: false }).is_none());
    }
}
