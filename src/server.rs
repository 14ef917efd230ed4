use crate::{
    entity::{is_hidden, verify_exists, Entity, Repository, Target},
    hooks::{self, HookRunner, RunOptions},
    program::Program,
    state::Lifecycle,
    Error, Result,
};
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::io;
use tiny_http::{Header, Method, Request, Response};

/// The port `serve` listens on when none is given.
pub const DEFAULT_PORT: u16 = 8080;

/// A status code with a JSON body.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    fn new(status: u16, body: Value) -> Self {
        Reply { status, body }
    }

    fn message(status: u16, message: impl Into<String>) -> Self {
        Reply::new(status, json!({ "message": message.into() }))
    }
}

/// A minimal HTTP front end exposing the enabled repositories and targets and
/// running target hooks on request.
///
/// Requests are handled one at a time, so hooks never run concurrently.
pub struct Server {
    program: Program,
    lifecycle: Lifecycle,
    runner: HookRunner,
}

impl Server {
    pub fn new(program: Program) -> Self {
        let runner = HookRunner::new(&program.default_shell);
        Server {
            program,
            lifecycle: Lifecycle::new(),
            runner,
        }
    }

    /// Start listening on every interface and serve requests until the process stops.
    pub fn listen(&self, port: u16) -> Result<()> {
        let address = format!("0.0.0.0:{port}");
        let listener = tiny_http::Server::http(&address).map_err(|err| {
            Error::io(
                format!("cannot start server on {address}"),
                io::Error::new(io::ErrorKind::Other, err),
            )
        })?;
        info!("Listening on {address}...");

        self.serve(&listener);
        Ok(())
    }

    /// Serve requests from a bound listener until it is closed.
    pub fn serve(&self, listener: &tiny_http::Server) {
        for request in listener.incoming_requests() {
            self.respond(request);
        }
    }

    fn respond(&self, request: Request) {
        debug!("Received request on {} {}.", request.method(), request.url());
        let reply = self.handle(request.method(), request.url());
        debug!("Responding with {}.", reply.status);

        let mut response =
            Response::from_string(reply.body.to_string()).with_status_code(reply.status);
        if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
            response = response.with_header(header);
        }
        if let Err(err) = request.respond(response) {
            warn!("Failed to respond: {err}.");
        }
    }

    /// Route a request to its reply.
    pub fn handle(&self, method: &Method, url: &str) -> Reply {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();

        match (method, segments.as_slice()) {
            (Method::Get, []) => self.list_repositories(),
            (Method::Get, ["repos", repo]) => self.list_targets(repo),
            (Method::Get, ["repos", repo, target]) => self.show_target(repo, target),
            (Method::Get, ["repos", _, _, "api"]) | (Method::Get, ["repos", _, _, "api", _]) => {
                Reply::message(400, "The API exclusively supports the use of the POST method.")
            }
            (Method::Post, ["repos", _, _, "api"]) => {
                Reply::message(400, "No action was specified.")
            }
            (Method::Post, ["repos", repo, target, "api", action]) => {
                self.run_action(repo, target, action)
            }
            _ => Reply::message(404, "The requested resource could not be found."),
        }
    }

    fn list_repositories(&self) -> Reply {
        match Repository::list(&self.program) {
            Ok(repos) => {
                let names: Vec<&str> = repos
                    .iter()
                    .filter(|repo| self.is_available(*repo))
                    .map(|repo| repo.name())
                    .collect();
                Reply::new(200, json!({ "repos": names }))
            }
            Err(err) => internal_error(err),
        }
    }

    fn list_targets(&self, repo: &str) -> Reply {
        let repo = match self.find_repository(repo) {
            Ok(repo) => repo,
            Err(reply) => return reply,
        };

        match repo.targets() {
            Ok(targets) => {
                let names: Vec<&str> = targets
                    .iter()
                    .filter(|target| self.is_available(*target))
                    .map(|target| target.name())
                    .collect();
                Reply::new(200, json!({ "repo": repo.name(), "targets": names }))
            }
            Err(err) => internal_error(err),
        }
    }

    fn show_target(&self, repo: &str, target: &str) -> Reply {
        let target = match self.find_target(repo, target) {
            Ok(target) => target,
            Err(reply) => return reply,
        };

        Reply::new(
            200,
            json!({
                "repo": target.repository().name(),
                "target": target.name(),
                "resources": ["api"],
            }),
        )
    }

    fn run_action(&self, repo: &str, target: &str, action: &str) -> Reply {
        let target = match self.find_target(repo, target) {
            Ok(target) => target,
            Err(reply) => return reply,
        };
        if is_hidden(action) {
            return Reply::message(404, format!("Hook '{action}' not found"));
        }
        let script = match hooks::locate(&target, action) {
            Ok(script) => script,
            Err(_) => return Reply::message(404, format!("Hook '{action}' not found")),
        };

        info!("Running {action} hook on {}.", target.label());
        match self
            .runner
            .run(&script, target.environment(), &RunOptions::default())
        {
            Ok(run) => {
                let (code, success) = (run.exit_code(), run.success());
                let command = json!({ "exitCode": code, "output": run.output });
                if success {
                    Reply::new(
                        200,
                        json!({
                            "message": "Hook finished running successfully",
                            "command": command,
                        }),
                    )
                } else {
                    Reply::new(
                        500,
                        json!({
                            "message": format!("Hook finished with the following exit code: {code}"),
                            "command": command,
                        }),
                    )
                }
            }
            Err(err) => internal_error(err.into()),
        }
    }

    /// Whether the entity exists and is enabled. Errors count as unavailable.
    fn is_available(&self, entity: &dyn Entity) -> bool {
        if is_hidden(entity.name()) || !verify_exists(entity) {
            return false;
        }
        match self.lifecycle.is_disabled(entity) {
            Ok(disabled) => !disabled,
            Err(err) => {
                warn!("{err}.");
                false
            }
        }
    }

    fn find_repository(&self, name: &str) -> std::result::Result<Repository, Reply> {
        let repo = Repository::new(name, &self.program);
        if self.is_available(&repo) {
            Ok(repo)
        } else {
            Err(Reply::message(404, "The requested repo could not be found."))
        }
    }

    fn find_target(&self, repo: &str, name: &str) -> std::result::Result<Target, Reply> {
        let repo = self.find_repository(repo)?;
        let target = Target::new(&repo, name);
        if self.is_available(&target) {
            Ok(target)
        } else {
            Err(Reply::message(404, "The requested target could not be found."))
        }
    }
}

fn internal_error(err: Error) -> Reply {
    warn!("{err}.");
    Reply::message(500, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestData;
    use std::thread;

    fn setup() -> TestData {
        let data = TestData::new();
        let core = data.create_repository("core");
        let extra = data.create_repository("extra");
        let x86_64 = data.create_target(&core, "x86_64");
        let aarch64 = data.create_target(&core, "aarch64");
        Lifecycle::new().disable(&extra).unwrap();
        Lifecycle::new().disable(&aarch64).unwrap();
        data.write_hook(&x86_64, "update", "echo \"updating $TARGET_NAME\"");
        data.write_hook(&x86_64, "broken", "echo broken\nexit 3");
        data
    }

    #[test]
    fn it_should_list_enabled_repositories_and_targets() {
        let data = setup();
        let server = Server::new(data.program().clone());

        let reply = server.handle(&Method::Get, "/");
        assert_eq!(200, reply.status);
        assert_eq!(json!({ "repos": ["core"] }), reply.body);

        let reply = server.handle(&Method::Get, "/repos/core/");
        assert_eq!(200, reply.status);
        assert_eq!(json!({ "repo": "core", "targets": ["x86_64"] }), reply.body);

        let reply = server.handle(&Method::Get, "/repos/core/x86_64");
        assert_eq!(200, reply.status);
        assert_eq!(json!(["api"]), reply.body["resources"]);
    }

    #[test]
    fn it_should_hide_missing_and_disabled_entities() {
        let data = setup();
        let server = Server::new(data.program().clone());

        for url in [
            "/repos/extra",
            "/repos/missing",
            "/repos/..",
            "/repos/core/aarch64",
            "/repos/core/missing",
            "/unknown",
            "/repos",
        ] {
            let reply = server.handle(&Method::Get, url);
            assert_eq!(404, reply.status, "{url} should be 404");
        }
        assert_eq!(
            404,
            server.handle(&Method::Post, "/repos/core/aarch64/api/update").status
        );
    }

    #[test]
    fn it_should_only_accept_posts_with_actions() {
        let data = setup();
        let server = Server::new(data.program().clone());

        assert_eq!(400, server.handle(&Method::Get, "/repos/core/x86_64/api").status);
        assert_eq!(
            400,
            server.handle(&Method::Get, "/repos/core/x86_64/api/update").status
        );
        let reply = server.handle(&Method::Post, "/repos/core/x86_64/api");
        assert_eq!(400, reply.status);
        assert_eq!(json!("No action was specified."), reply.body["message"]);
    }

    #[test]
    fn it_should_run_hooks_on_post() {
        let data = setup();
        let server = Server::new(data.program().clone());

        let reply = server.handle(&Method::Post, "/repos/core/x86_64/api/update?force=1");
        assert_eq!(200, reply.status);
        assert_eq!(
            json!({ "exitCode": 0, "output": "updating x86_64" }),
            reply.body["command"]
        );

        let reply = server.handle(&Method::Post, "/repos/core/x86_64/api/broken");
        assert_eq!(500, reply.status);
        assert_eq!(json!({ "exitCode": 3, "output": "broken" }), reply.body["command"]);

        let reply = server.handle(&Method::Post, "/repos/core/x86_64/api/deploy");
        assert_eq!(404, reply.status);
        assert_eq!(json!("Hook 'deploy' not found"), reply.body["message"]);
    }

    #[test]
    fn it_should_serve_over_http() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let data = setup();
        let server = Server::new(data.program().clone());

        let listener = tiny_http::Server::http("127.0.0.1:0")
            .map_err(|err| -> Box<dyn std::error::Error> { err })?;
        let port = listener
            .server_addr()
            .to_ip()
            .map(|address| address.port())
            .ok_or("the listener should have an IP address")?;
        thread::spawn(move || server.serve(&listener));
        let url = format!("http://127.0.0.1:{port}");

        let result = ureq::get(&format!("{url}/")).call()?;
        assert_eq!(200, result.status());
        assert_eq!("application/json", result.content_type());
        assert_eq!(r#"{"repos":["core"]}"#, result.into_string()?);

        let result = ureq::post(&format!("{url}/repos/core/x86_64/api/update")).call()?;
        assert_eq!(200, result.status());

        match ureq::get(&format!("{url}/repos/extra")).call() {
            Err(ureq::Error::Status(code, _)) => assert_eq!(404, code),
            other => panic!("{other:?} should be a 404"),
        }

        Ok(())
    }
}
