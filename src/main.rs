use anyhow::Result;
use board_client::api::{Api, BoardDraft, ClassifiedFailure, Role, SignupRequest};
use board_client::config::{Config, FileStorage};
use board_client::coordinator::{ErrorCoordinator, Navigator, REDIRECT_DELAY};
use board_client::notify::Notifier;
use board_client::session::SessionStore;
use board_client::state::StateStore;
use board_client::{logger, BoardApp};
use clap::{value_t_or_exit, App, AppSettings, Arg, ArgMatches, SubCommand};
use log::*;
use std::sync::Arc;
use std::time::Duration;

/// The login view of the command line is the `login` command itself.
struct CliNavigator {
    login_view: bool,
}

impl Navigator for CliNavigator {
    fn on_login_view(&self) -> bool {
        self.login_view
    }

    fn redirect_to_login(&self) {
        eprintln!("Run `board-client login <USER_ID> <PASSWORD>` to sign in.");
    }
}

fn cli() -> App<'static, 'static> {
    let id = |name: &'static str| Arg::with_name(name).required(true);
    App::new("board-client")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("DIR")
                .help("Directory holding config.yml")
                .takes_value(true),
        )
        .subcommand(
            SubCommand::with_name("login")
                .about("Sign in and store the session")
                .arg(id("user_id"))
                .arg(id("password")),
        )
        .subcommand(
            SubCommand::with_name("signup")
                .about("Create an account")
                .arg(id("user_id"))
                .arg(id("password"))
                .arg(id("name"))
                .arg(id("email")),
        )
        .subcommand(SubCommand::with_name("logout").about("Forget the stored session"))
        .subcommand(SubCommand::with_name("whoami").about("Show the signed-in user"))
        .subcommand(
            SubCommand::with_name("boards")
                .about("List boards")
                .arg(Arg::with_name("page").long("page").takes_value(true).default_value("0"))
                .arg(Arg::with_name("size").long("size").takes_value(true).default_value("10")),
        )
        .subcommand(
            SubCommand::with_name("show")
                .about("Show a board with its likes and comments")
                .arg(id("board")),
        )
        .subcommand(
            SubCommand::with_name("post")
                .about("Create a board")
                .arg(id("title"))
                .arg(id("content")),
        )
        .subcommand(
            SubCommand::with_name("delete")
                .about("Delete a board")
                .arg(id("board")),
        )
        .subcommand(
            SubCommand::with_name("like")
                .about("Toggle your like on a board")
                .arg(id("board")),
        )
        .subcommand(
            SubCommand::with_name("comments")
                .about("List comments on a board")
                .arg(id("board")),
        )
        .subcommand(
            SubCommand::with_name("comment")
                .about("Comment on a board")
                .arg(id("board"))
                .arg(id("text")),
        )
        .subcommand(SubCommand::with_name("users").about("List users (admin)"))
        .subcommand(
            SubCommand::with_name("role")
                .about("Change a user's role (admin)")
                .arg(id("user"))
                .arg(id("role")),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let mut config = Config::new();
    config.load(matches.value_of("config"))?;
    logger::init(config.level_filter())?;
    info!("Starting board client against {}...", config.base_url);

    let base_url = config.base_url.clone();
    let session = SessionStore::new(FileStorage::new(config));
    let state = StateStore::new();
    let navigator: Arc<dyn Navigator> = Arc::new(CliNavigator {
        login_view: matches.subcommand_name() == Some("login"),
    });
    let errors = ErrorCoordinator::global(Some(state.clone()), || {
        ErrorCoordinator::new(session.clone(), Notifier::new(), navigator.clone(), None)
    });
    errors.install_panic_hook();

    let app = BoardApp::new(
        Arc::new(Api::new(&base_url, session)),
        state,
        Arc::clone(&errors),
        navigator,
    );

    let outcome = run(&app, &matches).await;
    if let Some(banner) = errors.notifier().banner() {
        eprintln!("[{}] {}", banner.kind.label(), banner.message);
    }
    if let Err(failure) = outcome {
        if failure.is_unauthorized() {
            // Let the scheduled redirect notice print before exiting.
            tokio::time::sleep(REDIRECT_DELAY + Duration::from_millis(100)).await;
        }
        debug!("Command failed: {}", failure);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(app: &BoardApp, matches: &ArgMatches<'_>) -> Result<(), ClassifiedFailure> {
    match matches.subcommand() {
        ("login", Some(sub)) => {
            let response = app
                .login(
                    sub.value_of("user_id").unwrap_or_default(),
                    sub.value_of("password").unwrap_or_default(),
                )
                .await?;
            println!(
                "Signed in as {} ({:?})",
                response.user.name, response.user.role
            );
        }
        ("signup", Some(sub)) => {
            let password = sub.value_of("password").unwrap_or_default().to_string();
            let form = SignupRequest {
                user_id: sub.value_of("user_id").unwrap_or_default().to_string(),
                password_confirm: password.clone(),
                password,
                name: sub.value_of("name").unwrap_or_default().to_string(),
                email: sub.value_of("email").unwrap_or_default().to_string(),
            };
            app.signup(&form).await?;
            println!("Account created. You can sign in now.");
        }
        ("logout", _) => app.logout(),
        ("whoami", _) => {
            let user = app.refresh_me().await?;
            println!("{} [{}] ({:?})", user.name, user.user_id, user.role);
        }
        ("boards", Some(sub)) => {
            let page = value_t_or_exit!(sub, "page", u32);
            let size = value_t_or_exit!(sub, "size", u32);
            let listing = app.load_boards(page, size).await?;
            for board in listing.content.iter() {
                println!(
                    "#{:<5} {}  by {}  views {}",
                    board.board_no,
                    board.title,
                    board.author_display(),
                    board.view_cnt
                );
            }
            println!(
                "page {} of {} ({} boards)",
                listing.number + 1,
                listing.total_pages.max(1),
                listing.total_elements
            );
        }
        ("show", Some(sub)) => {
            let board_no = value_t_or_exit!(sub, "board", i64);
            let board = app.load_board(board_no).await?;
            app.load_like(board_no).await?;
            let view = app.like().view();
            println!("#{} {}", board.board_no, board.title);
            println!("by {}  views {}", board.author_display(), board.view_cnt);
            println!("{} {}", view.glyph(), view.count);
            println!();
            println!("{}", board.content);
            for comment in app.load_comments(board_no).await? {
                println!(
                    "  - {}: {}",
                    comment.author_name.as_deref().unwrap_or("unknown"),
                    comment.content
                );
            }
        }
        ("post", Some(sub)) => {
            let draft = BoardDraft {
                title: sub.value_of("title").unwrap_or_default().to_string(),
                content: sub.value_of("content").unwrap_or_default().to_string(),
            };
            let board = app.create_board(&draft).await?;
            println!("Created board #{}", board.board_no);
        }
        ("delete", Some(sub)) => {
            let board_no = value_t_or_exit!(sub, "board", i64);
            app.delete_board(board_no).await?;
            println!("Deleted board #{}", board_no);
        }
        ("like", Some(sub)) => {
            let board_no = value_t_or_exit!(sub, "board", i64);
            app.load_like(board_no).await?;
            if app.toggle_like(board_no).await?.is_some() {
                let view = app.like().view();
                println!("{} {}", view.glyph(), view.count);
            }
        }
        ("comments", Some(sub)) => {
            let board_no = value_t_or_exit!(sub, "board", i64);
            for comment in app.load_comments(board_no).await? {
                println!(
                    "#{:<5} {}: {}",
                    comment.comment_no,
                    comment.author_name.as_deref().unwrap_or("unknown"),
                    comment.content
                );
            }
        }
        ("comment", Some(sub)) => {
            let board_no = value_t_or_exit!(sub, "board", i64);
            let comment = app
                .add_comment(board_no, sub.value_of("text").unwrap_or_default())
                .await?;
            println!("Added comment #{}", comment.comment_no);
        }
        ("users", _) => {
            for user in app.users().await? {
                println!("#{:<5} {:<16} {} ({:?})", user.id, user.user_id, user.name, user.role);
            }
        }
        ("role", Some(sub)) => {
            let user_no = value_t_or_exit!(sub, "user", i64);
            let raw = sub.value_of("role").unwrap_or_default();
            let role = match Role::parse(raw) {
                Some(role) => role,
                None => {
                    let failure = ClassifiedFailure::from_status(
                        400,
                        format!("Unknown role '{}'; use USER or ADMIN.", raw),
                    );
                    app.errors().handle(&failure);
                    return Err(failure);
                }
            };
            app.update_user_role(user_no, role).await?;
            println!("User #{} is now {:?}", user_no, role);
        }
        _ => {}
    }
    Ok(())
}
