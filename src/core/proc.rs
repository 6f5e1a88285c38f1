//! The decoder process gateway.
//!
//! Builds and runs one external interpreter process per decode:
//!
//! `<interpreter> <script> <tag> <path> [full]`
//!
//! The interpreter and script are resolved from [DecoderSettings], in this order:
//! - an explicit interpreter option overrides platform discovery (`python3`/`python` on PATH)
//! - an explicit script option (may contain `${workspaceFolder}`) overrides the bundled script
//! - otherwise platform defaults are used
//!
//! The call blocks until the process exits. Stdout is split into non-empty lines in emission
//! order. A non-zero exit, a spawn error or a resolution failure becomes a [DecodeError]; the
//! gateway never panics and never hides the failure detail.
//!
//! A decoder that catches its own exception and prints the message still exits zero, so that
//! case arrives here as a successful [DecodeOutput] whose content is the error text.

use crate::config::{DEFAULT_OPTION, OptionSource, keys};
use crate::core::format::{FormatKind, PathStyle};
use crate::utils::expand_home_path;

use crossbeam_channel::bounded;
use thiserror::Error;
use tracing::{debug, warn};

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::Duration;

/// File name of the bundled decoding script.
pub const SCRIPT_FILE: &str = "read_files.py";

/// Placeholder substituted with the workspace root in script overrides.
pub const WORKSPACE_PLACEHOLDER: &str = "${workspaceFolder}";

/// Environment variable pointing at a directory holding [SCRIPT_FILE].
pub const SCRIPT_DIR_ENV: &str = "PDV_SCRIPT_DIR";

/// Whether the decoder should bound its output or dump everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    #[default]
    Preview,
    Full,
}

impl DecodeMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preview" | "default" => Some(DecodeMode::Preview),
            "full" => Some(DecodeMode::Full),
            _ => None,
        }
    }
}

/// Everything needed to run one decode. Built fresh per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeRequest {
    pub kind: FormatKind,
    pub file_path: String,
    pub interpreter: PathBuf,
    pub script: PathBuf,
    pub mode: DecodeMode,
    pub timeout: Option<Duration>,
}

/// Successful decoder output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeOutput {
    pub lines: Vec<String>,
    /// Whatever the decoder wrote to stderr, e.g. a traceback next to a handled exception.
    pub stderr: String,
}

/// Process-level decode failures.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("interpreter '{0}' could not be found")]
    InterpreterNotFound(String),
    #[error("decoding script not found (looked at: {})", display_paths(.searched))]
    ScriptNotFound { searched: Vec<PathBuf> },
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("decoder exited with {}: {stderr}", exit_label(.code))]
    Exit { code: Option<i32>, stderr: String },
    #[error("decoder did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("failed to collect decoder output: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError {
    /// One-line summary for the status line of an error document.
    pub fn summary(&self) -> &'static str {
        match self {
            DecodeError::InterpreterNotFound(_) | DecodeError::ScriptNotFound { .. } => {
                "Decoder is not configured correctly"
            }
            DecodeError::Spawn { .. } => "Could not start the decoder",
            DecodeError::Exit { .. } => "Decoder failed",
            DecodeError::TimedOut(_) => "Decoder timed out",
            DecodeError::Io(_) => "Could not read decoder output",
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"))
}

/// Outcome of one decode.
pub type DecodeResult = Result<DecodeOutput, DecodeError>;

/// Resolution policy and invocation knobs for the gateway.
#[derive(Debug, Clone, Default)]
pub struct DecoderSettings {
    /// Explicit interpreter, `None` for platform discovery.
    pub interpreter: Option<String>,
    /// Explicit script location, `None` for the bundled script.
    pub script: Option<String>,
    pub workspace_root: Option<PathBuf>,
    pub mode: DecodeMode,
    pub timeout: Option<Duration>,
    pub path_style: PathStyle,
}

fn explicit(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == DEFAULT_OPTION {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl DecoderSettings {
    /// Read the resolution policy through the configuration collaborator.
    pub fn from_options(options: &dyn OptionSource) -> Self {
        let timeout = options
            .get_option(keys::TIMEOUT_SECS)
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        Self {
            interpreter: explicit(options.get_option(keys::INTERPRETER)),
            script: explicit(options.get_option(keys::SCRIPT)),
            workspace_root: None,
            mode: DecodeMode::parse(&options.get_option(keys::MODE)).unwrap_or_default(),
            timeout,
            path_style: PathStyle::native(),
        }
    }

    pub fn with_workspace_root(mut self, root: Option<PathBuf>) -> Self {
        self.workspace_root = root;
        self
    }

    pub fn with_mode(mut self, mode: DecodeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Pick the interpreter: explicit option first, then `python3`/`python` on PATH.
    pub fn resolve_interpreter(&self) -> Result<PathBuf, DecodeError> {
        if let Some(configured) = &self.interpreter {
            let expanded = expand_home_path(configured);
            let has_separator = configured.contains(['/', '\\']);
            if has_separator {
                if expanded.exists() {
                    return Ok(expanded);
                }
                return Err(DecodeError::InterpreterNotFound(configured.clone()));
            }
            return which::which(configured)
                .map_err(|_| DecodeError::InterpreterNotFound(configured.clone()));
        }

        let candidates: &[&str] = if cfg!(windows) {
            &["python", "python3"]
        } else {
            &["python3", "python"]
        };
        for name in candidates {
            if let Ok(found) = which::which(name) {
                debug!(interpreter = %found.display(), "discovered default interpreter");
                return Ok(found);
            }
        }
        // Let the spawn report the missing interpreter.
        Ok(PathBuf::from(candidates[0]))
    }

    /// Pick the decoding script: explicit option (with placeholder substitution) or the
    /// bundled default.
    pub fn resolve_script(&self) -> Result<PathBuf, DecodeError> {
        if let Some(configured) = &self.script {
            let root = self
                .workspace_root
                .as_deref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            let substituted = configured.replace(WORKSPACE_PLACEHOLDER, &root);
            let path = expand_home_path(&substituted);
            if path.is_file() {
                return Ok(path);
            }
            return Err(DecodeError::ScriptNotFound {
                searched: vec![path],
            });
        }

        let searched = default_script_candidates();
        match searched.iter().find(|p| p.is_file()) {
            Some(found) => Ok(found.clone()),
            None => Err(DecodeError::ScriptNotFound { searched }),
        }
    }

    /// Build the request for one decode of `path` as `kind`.
    pub fn request(&self, kind: FormatKind, path: &str) -> Result<DecodeRequest, DecodeError> {
        Ok(DecodeRequest {
            kind,
            file_path: self.path_style.normalize(path).to_string(),
            interpreter: self.resolve_interpreter()?,
            script: self.resolve_script()?,
            mode: self.mode,
            timeout: self.timeout,
        })
    }
}

/// Places the bundled script may live, in lookup order.
pub fn default_script_candidates() -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Ok(dir) = std::env::var(SCRIPT_DIR_ENV) {
        out.push(PathBuf::from(dir).join(SCRIPT_FILE));
    }
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        out.push(exe_dir.join("scripts").join(SCRIPT_FILE));
    }
    if let Some(data) = dirs::data_dir() {
        out.push(data.join("pydata-preview").join("scripts").join(SCRIPT_FILE));
    }
    out.push(
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("scripts")
            .join(SCRIPT_FILE),
    );
    out
}

/// Resolve and run one decode. Resolution failures surface as [DecodeError]s.
pub fn invoke(kind: FormatKind, path: &str, settings: &DecoderSettings) -> DecodeResult {
    let request = settings.request(kind, path).inspect_err(|e| {
        warn!(path, error = %e, "could not resolve decoder");
    })?;
    run(&request)
}

/// Run an already resolved request, blocking until the process exits.
pub fn run(request: &DecodeRequest) -> DecodeResult {
    let program = request.interpreter.display().to_string();
    let mut cmd = Command::new(&request.interpreter);
    cmd.arg(&request.script)
        .arg(request.kind.tag().to_string())
        .arg(&request.file_path);
    if request.mode == DecodeMode::Full {
        cmd.arg("full");
    }
    cmd.env("PYTHONIOENCODING", "utf-8")
        .env("PYTHONUNBUFFERED", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(
        interpreter = %program,
        script = %request.script.display(),
        tag = request.kind.tag(),
        path = %request.file_path,
        "spawning decoder"
    );

    let child = cmd.spawn().map_err(|source| {
        warn!(interpreter = %program, error = %source, "failed to spawn decoder");
        DecodeError::Spawn {
            program: program.clone(),
            source,
        }
    })?;

    let output = match request.timeout {
        Some(limit) => wait_with_timeout(child, limit)?,
        None => child.wait_with_output()?,
    };

    let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
    if !output.status.success() {
        warn!(status = ?output.status.code(), "decoder exited unsuccessfully");
        return Err(DecodeError::Exit {
            code: output.status.code(),
            stderr,
        });
    }

    let lines = split_lines(&output.stdout);
    debug!(
        lines = lines.len(),
        stderr_len = stderr.len(),
        "decoder finished"
    );
    Ok(DecodeOutput { lines, stderr })
}

/// Split raw stdout into non-empty lines, keeping emission order.
pub fn split_lines(stdout: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Wait on a child with a deadline. On timeout the process is left running; its output is
/// dropped once it exits.
fn wait_with_timeout(child: Child, limit: Duration) -> Result<Output, DecodeError> {
    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        let _ = tx.send(child.wait_with_output());
    });
    match rx.recv_timeout(limit) {
        Ok(result) => Ok(result?),
        Err(_) => {
            warn!(?limit, "decoder timed out");
            Err(DecodeError::TimedOut(limit))
        }
    }
}

/// Integration tests for the gateway. Process tests use `sh` as a stand-in interpreter.
#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use tempfile::tempdir;

    fn sh_available() -> bool {
        cfg!(unix) && which::which("sh").is_ok()
    }

    macro_rules! skip_if_no_sh {
        () => {
            if !sh_available() {
                return Ok(());
            }
        };
    }

    fn sh_request(script: &Path, kind: FormatKind, file: &str) -> DecodeRequest {
        DecodeRequest {
            kind,
            file_path: file.to_string(),
            interpreter: PathBuf::from("sh"),
            script: script.to_path_buf(),
            mode: DecodeMode::Preview,
            timeout: None,
        }
    }

    #[test]
    fn test_lines_keep_emission_order() -> Result<(), Box<dyn std::error::Error>> {
        skip_if_no_sh!();
        let dir = tempdir()?;
        let script = dir.path().join("decoder.sh");
        fs::write(
            &script,
            "echo \"tag=$1\"\necho \"path=$2\"\necho\necho '  zeta'\necho 'alpha'\n",
        )?;

        let out = run(&sh_request(&script, FormatKind::ModelCheckpoint, "/tmp/w.pt"))?;
        assert_eq!(
            out.lines,
            vec!["tag=2", "path=/tmp/w.pt", "  zeta", "alpha"]
        );
        Ok(())
    }

    #[test]
    fn test_nonzero_exit_is_failure() -> Result<(), Box<dyn std::error::Error>> {
        skip_if_no_sh!();
        let dir = tempdir()?;
        let script = dir.path().join("fail.sh");
        fs::write(&script, "echo partial\necho oops >&2\nexit 3\n")?;

        match run(&sh_request(&script, FormatKind::NumericArray, "x.npy")) {
            Err(DecodeError::Exit { code, stderr }) => {
                assert_eq!(code, Some(3));
                assert!(stderr.contains("oops"));
            }
            other => return Err(format!("expected exit failure, got {:?}", other).into()),
        }
        Ok(())
    }

    #[test]
    fn test_handled_exception_is_success() -> Result<(), Box<dyn std::error::Error>> {
        skip_if_no_sh!();
        let dir = tempdir()?;
        let script = dir.path().join("handled.sh");
        fs::write(&script, "echo 'Error processing file: bad magic'\necho trace >&2\n")?;

        let out = run(&sh_request(&script, FormatKind::GenericObject, "x.pkl"))?;
        assert_eq!(out.lines, vec!["Error processing file: bad magic"]);
        assert_eq!(out.stderr, "trace");
        Ok(())
    }

    #[test]
    fn test_spawn_failure() {
        let mut req = sh_request(Path::new("script.py"), FormatKind::NumericArray, "x.npy");
        req.interpreter = PathBuf::from("/definitely/not/an/interpreter");
        assert!(matches!(run(&req), Err(DecodeError::Spawn { .. })));
    }

    #[test]
    fn test_full_mode_appends_argument() -> Result<(), Box<dyn std::error::Error>> {
        skip_if_no_sh!();
        let dir = tempdir()?;
        let script = dir.path().join("mode.sh");
        fs::write(&script, "echo \"mode=${3:-preview}\"\n")?;

        let mut req = sh_request(&script, FormatKind::NumericArray, "x.npy");
        assert_eq!(run(&req)?.lines, vec!["mode=preview"]);
        req.mode = DecodeMode::Full;
        assert_eq!(run(&req)?.lines, vec!["mode=full"]);
        Ok(())
    }

    #[test]
    fn test_timeout() -> Result<(), Box<dyn std::error::Error>> {
        skip_if_no_sh!();
        let dir = tempdir()?;
        let script = dir.path().join("slow.sh");
        fs::write(&script, "sleep 3\necho late\n")?;

        let mut req = sh_request(&script, FormatKind::NumericArray, "x.npy");
        req.timeout = Some(Duration::from_millis(100));
        assert!(matches!(run(&req), Err(DecodeError::TimedOut(_))));
        Ok(())
    }

    #[test]
    fn test_script_placeholder_substitution() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("tools"))?;
        let script = dir.path().join("tools").join("custom.py");
        fs::write(&script, "print('hi')\n")?;

        let settings = DecoderSettings {
            script: Some(format!("{WORKSPACE_PLACEHOLDER}/tools/custom.py")),
            ..DecoderSettings::default()
        }
        .with_workspace_root(Some(dir.path().to_path_buf()));
        assert_eq!(settings.resolve_script()?, script);

        let missing = DecoderSettings {
            script: Some(format!("{WORKSPACE_PLACEHOLDER}/tools/custom.py")),
            ..DecoderSettings::default()
        };
        assert!(matches!(
            missing.resolve_script(),
            Err(DecodeError::ScriptNotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_missing_interpreter_override() {
        let settings = DecoderSettings {
            interpreter: Some("/no/such/python".into()),
            ..DecoderSettings::default()
        };
        assert!(matches!(
            settings.resolve_interpreter(),
            Err(DecodeError::InterpreterNotFound(_))
        ));
        assert!(matches!(
            invoke(FormatKind::NumericArray, "a.npy", &settings),
            Err(DecodeError::InterpreterNotFound(_))
        ));
    }

    #[test]
    fn test_request_normalizes_drive_letter_path() -> Result<(), Box<dyn std::error::Error>> {
        if !sh_available() {
            return Ok(());
        }
        let dir = tempdir()?;
        let script = dir.path().join("s.sh");
        fs::write(&script, "true\n")?;
        let settings = DecoderSettings {
            interpreter: Some("sh".into()),
            script: Some(script.to_string_lossy().into_owned()),
            path_style: PathStyle::DriveLetter,
            ..DecoderSettings::default()
        };
        let req = settings.request(FormatKind::NumericArray, "/C:/data/a.npy")?;
        assert_eq!(req.file_path, "C:/data/a.npy");
        assert_eq!(req.script, script);
        Ok(())
    }

    #[test]
    fn test_bundled_script_handles_garbage() -> Result<(), Box<dyn std::error::Error>> {
        if which::which("python3").is_err() {
            return Ok(());
        }
        let dir = tempdir()?;
        let file = dir.path().join("garbage.npy");
        fs::write(&file, b"not a numpy file")?;

        let settings = DecoderSettings {
            interpreter: Some("python3".into()),
            script: Some(
                Path::new(env!("CARGO_MANIFEST_DIR"))
                    .join("scripts")
                    .join(SCRIPT_FILE)
                    .to_string_lossy()
                    .into_owned(),
            ),
            ..DecoderSettings::default()
        };
        let out = invoke(
            FormatKind::NumericArray,
            &file.to_string_lossy(),
            &settings,
        )?;
        assert!(!out.lines.is_empty(), "decoder should print the error text");
        Ok(())
    }
}
