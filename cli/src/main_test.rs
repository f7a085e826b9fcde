use super::*;
use tripbook::state::ui::{Notice, Route};

#[test]
fn split_fields_requires_exact_count() {
    let [name, description] = split_fields::<2>("transport", "Train | Overnight sleeper").expect("two fields");
    assert_eq!(name, "Train");
    assert_eq!(description, "Overnight sleeper");

    let err = split_fields::<3>("activity", "Hike|Ridge walk").expect_err("too few");
    assert!(err.to_string().contains("3 fields"));
}

#[test]
fn create_args_build_a_draft() {
    let cli = Cli::parse_from([
        "tripbook",
        "trips",
        "create",
        "--title",
        "Alps",
        "--budget",
        "1200",
        "--tag",
        "mountains",
        "--tag",
        "winter",
        "--accommodation",
        "Hotel|Main St 1|2025-01-01|2025-01-05",
        "--activity",
        "Ski|Downhill|Zermatt",
    ]);
    let Command::Trips(TripsCommand { command: TripsSubcommand::Create(args) }) = cli.command else {
        panic!("expected trips create");
    };
    let draft = args.into_draft().expect("draft");
    assert_eq!(draft.title, "Alps");
    assert!((draft.budget - 1200.0).abs() < f64::EPSILON);
    assert_eq!(draft.tags, vec!["mountains".to_owned(), "winter".to_owned()]);
    assert_eq!(draft.accommodation[0].check_out, "2025-01-05");
    assert_eq!(draft.activities[0].location, "Zermatt");
    assert!(draft.images.is_empty());
}

#[test]
fn missing_image_file_is_reported() {
    let err = read_image(Path::new("/nonexistent/tripbook.png")).expect_err("missing file");
    assert!(matches!(err, CliError::ReadFile { .. }));
}

#[test]
fn error_notice_fails_the_command() {
    let outcome = Outcome::notice(Notice::error("Unauthorized")).redirect_to(Route::Login);
    let err = report(&outcome).expect_err("error notice");
    assert_eq!(err.to_string(), "Unauthorized");

    assert!(report(&Outcome::notice(Notice::success("Added to favorites"))).is_ok());
}

#[test]
fn command_names_leave_arguments_out() {
    let login = Cli::parse_from(["tripbook", "login", "--email", "ada@example.test", "--password", "hunter22"]);
    assert_eq!(login.command.name(), "login");

    let create = Cli::parse_from(["tripbook", "trips", "create", "--title", "Alps"]);
    assert_eq!(create.command.name(), "trips create");

    let watch = Cli::parse_from(["tripbook", "watch", "t1"]);
    assert_eq!(watch.command.name(), "watch");
}
