//! Integration tests for warmboot

mod support {
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Write};
    use std::net::{TcpListener, TcpStream};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    pub const MODEL: &str =
        r#"{"format": "layers-model", "modelTopology": {"layers": []}, "weightsManifest": [{"paths": ["weights.bin"]}]}"#;

    /// Minimal HTTP/1.1 server for one test; lives until the process exits
    pub struct TestServer {
        pub base_url: String,
        online: Arc<AtomicBool>,
    }

    impl TestServer {
        pub fn start(routes: &[(&str, &str)]) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            let routes: HashMap<String, Vec<u8>> = routes
                .iter()
                .map(|(path, body)| (path.to_string(), body.as_bytes().to_vec()))
                .collect();
            let online = Arc::new(AtomicBool::new(true));

            let flag = online.clone();
            thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(stream) = stream else { continue };
                    if !flag.load(Ordering::SeqCst) {
                        drop(stream);
                        continue;
                    }
                    respond(stream, &routes);
                }
            });

            Self { base_url, online }
        }

        /// The site with a shell and a model
        pub fn site() -> Self {
            Self::start(&[
                ("/shell.html", "<html>digits</html>"),
                ("/app.bundle.js", "main()"),
                ("/model/model.json", MODEL),
                ("/model/weights.bin", "0123456789"),
            ])
        }

        /// Accept connections but close them unanswered
        pub fn go_offline(&self) {
            self.online.store(false, Ordering::SeqCst);
        }
    }

    fn respond(mut stream: TcpStream, routes: &HashMap<String, Vec<u8>>) {
        let Ok(clone) = stream.try_clone() else { return };
        let mut reader = BufReader::new(clone);

        let mut request_line = String::new();
        if reader.read_line(&mut request_line).is_err() {
            return;
        }
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) if line == "\r\n" => break,
                Ok(_) => {}
            }
        }

        let path = request_line.split_whitespace().nth(1).unwrap_or("/");
        let (status, body) = match routes.get(path) {
            Some(body) => ("200 OK", body.clone()),
            None => ("404 Not Found", b"not found".to_vec()),
        };

        let _ = write!(
            stream,
            "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            body.len()
        );
        let _ = stream.write_all(&body);
        let _ = stream.flush();
    }

    /// Write a config pointing at `base_url` with its cache under `dir`;
    /// `bootstrap` lines are appended to the `[bootstrap]` table
    pub fn write_config(dir: &Path, base_url: &str, bootstrap: &str) -> PathBuf {
        let path = dir.join("config.toml");
        let cache = dir.join("cache");
        let content = format!(
            "[origin]\nbase_url = \"{}\"\n\n[cache]\ndir = '{}'\nversion = \"v1\"\n\n[bootstrap]\nbackoff_base_ms = 10\nattempt_timeout_secs = 5\n{}\n",
            base_url,
            cache.display(),
            bootstrap
        );
        std::fs::write(&path, content).unwrap();
        path
    }
}

mod cli_tests {
    use super::support::{write_config, TestServer};
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn warmboot(config: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("warmboot");
        cmd.arg("--config").arg(config).env_remove("WARMBOOT_CONFIG");
        cmd
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("warmboot")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("offline-first"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("warmboot")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("warmboot"));
    }

    #[test]
    fn config_path_follows_env() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("from-env.toml");

        cargo_bin_cmd!("warmboot")
            .args(["config", "path"])
            .env("WARMBOOT_CONFIG", &path)
            .assert()
            .success()
            .stdout(predicate::str::contains("from-env.toml"));
    }

    #[test]
    fn config_show_uses_defaults_when_missing() {
        let temp = TempDir::new().unwrap();

        warmboot(&temp.path().join("missing.toml"))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[bootstrap]"))
            .stdout(predicate::str::contains("max_attempts = 3"));
    }

    #[test]
    fn config_init_then_validate() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("warmboot").join("config.toml");

        warmboot(&path)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(path.exists());

        warmboot(&path)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--force"));

        warmboot(&path)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration valid"));
    }

    #[test]
    fn config_validate_reports_problems() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path(), "http://127.0.0.1:9", "max_attempts = 0");

        warmboot(&config)
            .args(["config", "validate"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("max_attempts must be at least 1"))
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn runtime_commands_refuse_invalid_config() {
        let temp = TempDir::new().unwrap();
        let config = write_config(
            temp.path(),
            "http://127.0.0.1:9",
            "\n[network]\ntimeout_secs = 0",
        );

        for args in [&["install"][..], &["boot", "--no-prompt"], &["fetch", "/shell.html"]] {
            warmboot(&config)
                .args(args)
                .assert()
                .failure()
                .stderr(predicate::str::contains("network.timeout_secs must be at least 1"))
                .stderr(predicate::str::contains("warmboot config validate"));
        }

        // Inspection still works so the problem can be found and fixed
        warmboot(&config).args(["config", "show"]).assert().success();
    }

    #[test]
    fn malformed_config_fails_with_hint() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[origin\nbase_url = ").unwrap();

        warmboot(&path)
            .args(["cache", "list"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn install_creates_one_generation() {
        let temp = TempDir::new().unwrap();
        let server = TestServer::site();
        let config = write_config(temp.path(), &server.base_url, "");

        warmboot(&config)
            .arg("install")
            .assert()
            .success()
            .stdout(predicate::str::contains("Installed digit-recognizer-v1"))
            .stdout(predicate::str::contains("2 resource(s)"));

        warmboot(&config)
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout("digit-recognizer-v1\n");

        warmboot(&config)
            .arg("install")
            .assert()
            .success()
            .stdout(predicate::str::contains("already installed"));
    }

    #[test]
    fn install_fails_when_shell_missing() {
        let temp = TempDir::new().unwrap();
        let server = TestServer::start(&[("/shell.html", "<html>")]);
        let config = write_config(temp.path(), &server.base_url, "");

        warmboot(&config)
            .arg("install")
            .assert()
            .failure()
            .stderr(predicate::str::contains("app.bundle.js"));
    }

    #[test]
    fn cache_list_json() {
        let temp = TempDir::new().unwrap();
        let server = TestServer::site();
        let config = write_config(temp.path(), &server.base_url, "");

        warmboot(&config).arg("install").assert().success();

        warmboot(&config)
            .args(["cache", "list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"id\": \"digit-recognizer-v1\""))
            .stdout(predicate::str::contains("\"state\": \"complete\""))
            .stdout(predicate::str::contains("\"entries\": 2"));
    }

    #[test]
    fn cache_info_lists_entries() {
        let temp = TempDir::new().unwrap();
        let server = TestServer::site();
        let config = write_config(temp.path(), &server.base_url, "");

        warmboot(&config).arg("install").assert().success();

        warmboot(&config)
            .args(["cache", "info"])
            .assert()
            .success()
            .stdout(predicate::str::contains("/shell.html"))
            .stdout(predicate::str::contains("/app.bundle.js"))
            .stdout(predicate::str::contains("Total: 2 entries"));
    }

    #[test]
    fn fetch_serves_cached_shell_offline() {
        let temp = TempDir::new().unwrap();
        let server = TestServer::site();
        let config = write_config(temp.path(), &server.base_url, "");

        warmboot(&config).arg("install").assert().success();
        server.go_offline();

        warmboot(&config)
            .args(["fetch", "/shell.html"])
            .assert()
            .success()
            .stdout("<html>digits</html>");

        let output = temp.path().join("bundle.js");
        warmboot(&config)
            .args(["fetch", "app.bundle.js", "-o"])
            .arg(&output)
            .assert()
            .success();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "main()");
    }

    #[test]
    fn fetch_uncached_offline_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let server = TestServer::site();
        let config = write_config(temp.path(), &server.base_url, "");

        warmboot(&config).arg("install").assert().success();
        server.go_offline();

        warmboot(&config)
            .args(["fetch", "/never-cached.txt"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("no cached version is available"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn fetch_not_found_is_http_error() {
        let temp = TempDir::new().unwrap();
        let server = TestServer::site();
        let config = write_config(temp.path(), &server.base_url, "");

        warmboot(&config)
            .args(["fetch", "/missing.js"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("HTTP 404"));
    }

    #[test]
    fn boot_then_boot_offline() {
        let temp = TempDir::new().unwrap();
        let server = TestServer::site();
        let config = write_config(temp.path(), &server.base_url, "");

        warmboot(&config)
            .args(["boot", "--no-prompt"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Loading model (attempt 1/3)"))
            .stdout(predicate::str::contains("Application ready"));

        server.go_offline();

        warmboot(&config)
            .args(["boot", "--no-prompt"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Ready"));
    }

    #[test]
    fn boot_gives_up_after_three_attempts() {
        let temp = TempDir::new().unwrap();
        let server = TestServer::start(&[("/shell.html", "<html>"), ("/app.bundle.js", "main()")]);
        let config = write_config(temp.path(), &server.base_url, "");

        warmboot(&config)
            .args(["boot", "--no-prompt"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("Loading model (attempt 3/3)"))
            .stdout(predicate::str::contains("retrying in 10ms"))
            .stdout(predicate::str::contains("retrying in 20ms"))
            .stderr(predicate::str::contains("after 3 attempt(s)"));
    }

    #[test]
    fn boot_retries_flag_restarts_from_first_attempt() {
        let temp = TempDir::new().unwrap();
        let server = TestServer::start(&[("/shell.html", "<html>"), ("/app.bundle.js", "main()")]);
        let config = write_config(temp.path(), &server.base_url, "max_attempts = 2");

        let assert = warmboot(&config)
            .args(["boot", "--retries", "1", "--no-prompt"])
            .assert()
            .failure();

        let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
        assert_eq!(stdout.matches("Loading model (attempt 1/2)").count(), 2);
    }

    #[test]
    fn boot_without_network_or_cache_fails() {
        let temp = TempDir::new().unwrap();
        let server = TestServer::site();
        server.go_offline();
        let config = write_config(temp.path(), &server.base_url, "");

        warmboot(&config)
            .args(["boot", "--no-prompt"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to cache required resource"));
    }

    #[test]
    fn cache_clear_requires_confirmation() {
        let temp = TempDir::new().unwrap();
        let server = TestServer::site();
        let config = write_config(temp.path(), &server.base_url, "");

        warmboot(&config).arg("install").assert().success();

        warmboot(&config)
            .args(["cache", "clear"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing deleted"));

        warmboot(&config)
            .args(["cache", "clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 1 generation(s)"));

        warmboot(&config)
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout("");
    }
}
