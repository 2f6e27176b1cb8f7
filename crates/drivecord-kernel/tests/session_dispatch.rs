//! End-to-end tests for the shell session: startup, the read-eval loop,
//! permission gating, tree refreshes and every built-in command group.
//!
//! Sessions run against a [`MemoryDrive`] and a [`ScriptedFrontend`]; the
//! drive handle and the transcript are kept to inspect the results.

use std::fs;
use std::sync::Arc;

use drivecord_kernel::{
    ApiError, CommandRegistry, DriveApi, EntryType, ExitReason, Flow, MemoryDrive, Output,
    ScriptedFrontend, SessionConfig, SessionError, ShellSession, Transcript,
};
use drivecord_types::{Instance, InstanceId, Permissions, Rank, SnapshotEntry};

// ============================================================================
// Shared test setup
// ============================================================================

const ME: u64 = 100;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn owner() -> Permissions {
    Permissions::none().with_owner(true)
}

/// A single drive with a small tree and one member of each kind.
fn drive_with(permissions: Permissions) -> MemoryDrive {
    MemoryDrive::new()
        .with_instance(Instance::new(1, "family"), permissions)
        .with_member(1, "me", ME, Some(permissions))
        .with_member(1, "amy", 101, Some(Permissions::none().with_read(true)))
        .with_member(1, "boss", 102, Some(Permissions::none().with_admin(true)))
        .with_member(1, "root", 103, Some(owner()))
        .with_member(1, "guest", 104, None)
        .with_file(1, "~/docs/a.txt", "0123456789")
        .with_dir(1, "~/docs/sub/")
        .with_file(1, "~/top.md", "hi")
}

fn config() -> SessionConfig {
    SessionConfig {
        user_id: Some(ME),
        ..SessionConfig::default()
    }
}

fn start(
    drive: &MemoryDrive,
    frontend: ScriptedFrontend,
    config: SessionConfig,
) -> Result<(ShellSession, Transcript), SessionError> {
    init_tracing();
    let transcript = frontend.transcript();
    let registry = Arc::new(CommandRegistry::with_builtins().expect("builtins register"));
    let session = ShellSession::start(Box::new(drive.clone()), Box::new(frontend), registry, config)?;
    Ok((session, transcript))
}

fn session(drive: &MemoryDrive) -> (ShellSession, Transcript) {
    start(drive, ScriptedFrontend::new(), config()).expect("session starts")
}

fn dispatch(session: &mut ShellSession, line: &str) {
    assert_eq!(session.dispatch(line).unwrap(), Flow::Continue, "{line}");
}

fn last_error(transcript: &Transcript) -> String {
    transcript.errors().pop().unwrap_or_default()
}

// ============================================================================
// Startup
// ============================================================================

#[test]
fn test_single_instance_is_selected_automatically() {
    let drive = drive_with(owner());
    let (session, transcript) = session(&drive);

    assert_eq!(session.instance().name, "family");
    assert_eq!(session.rank(), Rank::Owner);
    assert_eq!(session.cwd_path(), "~/");
    assert_eq!(transcript.successes(), ["Selected the only instance: family"]);
}

#[test]
fn test_no_instances_is_fatal() {
    let err = start(&MemoryDrive::new(), ScriptedFrontend::new(), config()).unwrap_err();
    assert!(matches!(err, SessionError::NoInstances));
}

#[test]
fn test_missing_permissions_is_fatal() {
    let drive = MemoryDrive::new().with_forbidden_instance(Instance::new(5, "locked"));
    let err = start(&drive, ScriptedFrontend::new(), config()).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Permissions {
            source: ApiError::Forbidden,
            ..
        }
    ));
}

#[test]
fn test_preferred_instance_skips_the_question() {
    let drive = drive_with(owner()).with_instance(Instance::new(2, "work"), owner());
    let config = SessionConfig {
        preferred_instance: Some(InstanceId(2)),
        ..config()
    };
    let (session, _) = start(&drive, ScriptedFrontend::new(), config).unwrap();
    assert_eq!(session.instance().name, "work");
}

#[test]
fn test_malformed_structure_leaves_session_unnavigable() {
    let broken = SnapshotEntry {
        name: None,
        ..SnapshotEntry::root()
    };
    let drive = drive_with(owner()).with_structure(1, broken);
    let (mut session, transcript) = session(&drive);

    assert!(session.tree().is_err());
    assert_eq!(transcript.warnings().len(), 1);

    dispatch(&mut session, "cd docs");
    assert_eq!(last_error(&transcript), "drive structure is unavailable");

    drive.set_structure(1, None);
    dispatch(&mut session, "cd docs");
    assert_eq!(session.cwd_path(), "~/docs/");
}

// ============================================================================
// Read-eval loop
// ============================================================================

#[test]
fn test_navigation_end_to_end() {
    let drive = drive_with(owner());
    let frontend = ScriptedFrontend::new().with_lines([
        "cd docs",
        "cd sub",
        "cd ../..",
        "cd docs/a.txt",
        "cd missing",
        "cd ~/docs",
        "home",
    ]);
    let (mut session, transcript) = start(&drive, frontend, config()).unwrap();

    assert_eq!(session.run().unwrap(), ExitReason::Interrupted);

    let cwds: Vec<_> = transcript.prompts().into_iter().map(|p| p.cwd).collect();
    assert_eq!(
        cwds,
        ["~/", "~/docs/", "~/docs/sub/", "~/", "~/", "~/", "~/docs/", "~/"]
    );
    let errors = transcript.errors();
    assert!(errors[0].contains("`docs/a.txt` is a file"), "{errors:?}");
    assert_eq!(errors[1], "target path doesn't exist: ~/missing");
    assert_eq!(errors[2], "Exiting...");
}

#[test]
fn test_prompt_carries_rank_and_instance() {
    let drive = drive_with(Permissions::none().with_write(true));
    let (session, _) = session(&drive);
    let prompt = session.prompt();
    assert_eq!(prompt.rank, Rank::Write);
    assert_eq!(prompt.instance, "family");
    assert_eq!(prompt.cwd, "~/");
}

#[test]
fn test_parse_errors_do_not_end_the_loop() {
    let drive = drive_with(owner());
    let frontend = ScriptedFrontend::new().with_lines(["", "bogus", "cd", "ls maybe", "exit"]);
    let (mut session, transcript) = start(&drive, frontend, config()).unwrap();

    assert_eq!(session.run().unwrap(), ExitReason::Exit);
    let errors = transcript.errors();
    assert_eq!(errors.len(), 4);
    assert_eq!(errors[0], "blank input");
    assert_eq!(errors[1], "command `bogus` not found");
    assert_eq!(errors[2], "missing parameter 1 <Path: Text>");
    assert!(errors[3].contains("`maybe`"));
}

#[test]
fn test_interrupt_stops_before_remaining_input() {
    let drive = drive_with(owner());
    let frontend = ScriptedFrontend::new()
        .with_lines(["ls"])
        .with_interrupt()
        .with_lines(["exit"]);
    let (mut session, _) = start(&drive, frontend, config()).unwrap();
    assert_eq!(session.run().unwrap(), ExitReason::Interrupted);
    assert_eq!(ExitReason::Interrupted.exit_code(), 1);
}

#[test]
fn test_exit_and_logout() {
    let drive = drive_with(owner());
    let (mut session, _) = start(&drive, ScriptedFrontend::new().with_lines(["quit"]), config()).unwrap();
    assert_eq!(session.run().unwrap(), ExitReason::Exit);
    assert!(!drive.is_logged_out());

    let (mut session, _) = start(&drive, ScriptedFrontend::new().with_lines(["exit yes"]), config()).unwrap();
    assert_eq!(session.run().unwrap(), ExitReason::Logout);
    assert!(drive.is_logged_out());
}

#[test]
fn test_logout_command_burns_token() {
    let drive = drive_with(owner());
    let (mut session, transcript) = session(&drive);
    assert_eq!(session.dispatch("logout").unwrap(), Flow::Exit(ExitReason::Logout));
    assert!(drive.is_logged_out());
    assert!(transcript.successes().contains(&"Logged out.".to_string()));
}

#[test]
fn test_unauthorized_is_fatal() {
    let drive = drive_with(owner());
    let (mut session, _) = session(&drive);
    drive.logout().unwrap();

    let err = session.dispatch("ls").unwrap_err();
    assert!(matches!(err, SessionError::Api(ApiError::Unauthorized)));
}

// ============================================================================
// Permission gating
// ============================================================================

#[test]
fn test_insufficient_rank_never_invokes() {
    let drive = drive_with(Permissions::none().with_read(true));
    let (mut session, transcript) = session(&drive);

    dispatch(&mut session, "mkfile x.txt");
    assert_eq!(
        last_error(&transcript),
        "`mkfile` requires at least Write permissions"
    );
    assert!(!drive.exists(1, "~/x.txt"));

    dispatch(&mut session, "trace top.md");
    assert_eq!(last_error(&transcript), "`trace` requires at least Admin permissions");

    // Read-level and open commands still work.
    dispatch(&mut session, "ls");
    dispatch(&mut session, "help");
    assert_eq!(transcript.errors().len(), 2);
}

#[test]
fn test_admin_passes_write_gate() {
    let drive = drive_with(Permissions::none().with_admin(true));
    let (mut session, transcript) = session(&drive);
    dispatch(&mut session, "mkdir new");
    dispatch(&mut session, "cachedump");
    assert!(transcript.errors().is_empty(), "{:?}", transcript.errors());
    assert!(drive.exists(1, "~/new/"));
}

// ============================================================================
// Structure refresh
// ============================================================================

#[test]
fn test_mutations_refresh_the_tree() {
    let drive = drive_with(owner());
    let (mut session, transcript) = session(&drive);

    dispatch(&mut session, "cd docs");
    dispatch(&mut session, "mkfile new.txt");
    dispatch(&mut session, "mkdir fresh");
    dispatch(&mut session, "rename a.txt b.txt");
    dispatch(&mut session, "rm sub");

    let tree = session.tree().unwrap();
    let root = tree.root();
    assert!(tree.resolve_file(root, "docs/new.txt").is_ok());
    assert!(tree.resolve_dir(root, "docs/fresh").is_ok());
    assert!(tree.resolve_file(root, "docs/b.txt").is_ok());
    assert!(tree.resolve(root, "docs/a.txt").is_err());
    assert!(tree.resolve(root, "docs/sub").is_err());
    assert_eq!(session.cwd_path(), "~/docs/");
    assert_eq!(
        transcript.successes()[1..],
        [
            "Created file: new.txt",
            "Created directory: fresh",
            "Renamed: a.txt -> b.txt",
            "Removed: sub",
        ]
    );
}

#[test]
fn test_remote_conflict_is_reported() {
    let drive = drive_with(owner());
    let (mut session, transcript) = session(&drive);
    dispatch(&mut session, "mkfile top.md");
    assert_eq!(last_error(&transcript), "Object already exists: top.md");
}

#[test]
fn test_vanished_cwd_falls_back_to_root() {
    let drive = drive_with(owner());
    let (mut session, transcript) = session(&drive);
    dispatch(&mut session, "cd docs/sub");

    drive.remove(InstanceId(1), "~/", "docs").unwrap();
    dispatch(&mut session, "ls");

    assert_eq!(session.cwd_path(), "~/");
    let warnings = transcript.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("~/docs/sub/"));
}

#[test]
fn test_malformed_refresh_keeps_previous_tree() {
    let drive = drive_with(owner());
    let (mut session, transcript) = session(&drive);
    dispatch(&mut session, "cd docs");

    drive.set_structure(
        1,
        Some(SnapshotEntry::root().with_file(SnapshotEntry {
            path: None,
            ..SnapshotEntry::file("x", "~/x", 1)
        })),
    );
    dispatch(&mut session, "ls");

    assert_eq!(session.cwd_path(), "~/docs/");
    assert!(session.tree().unwrap().resolve(session.cwd(), "a.txt").is_ok());
    let warnings = transcript.warnings();
    assert!(warnings[0].contains("file entry is missing `path`"), "{warnings:?}");
    assert!(warnings[0].contains("keeping the previous structure"));
}

#[test]
fn test_cwd_survives_refresh_with_server_side_paths() {
    let snapshot = SnapshotEntry::root().with_dir(
        SnapshotEntry::dir("docs", "/srv/docs/")
            .with_file(SnapshotEntry::file("a.txt", "/srv/docs/a.txt", 10)),
    );
    let drive = drive_with(owner()).with_structure(1, snapshot);
    let (mut session, transcript) = session(&drive);

    dispatch(&mut session, "cd docs");
    assert_eq!(session.cwd_path(), "~/docs/");
    dispatch(&mut session, "ls");
    dispatch(&mut session, "ls");

    assert_eq!(session.cwd_path(), "~/docs/");
    assert!(transcript.warnings().is_empty(), "{:?}", transcript.warnings());
}

// ============================================================================
// Listing and help
// ============================================================================

#[test]
fn test_ls_renders_sizes() {
    let drive = drive_with(owner());
    let (mut session, transcript) = session(&drive);
    dispatch(&mut session, "ls yes");

    let Some(Output::Tree(view)) = transcript.outputs().pop() else {
        panic!("expected a tree");
    };
    assert!(view.recursive);
    let rows: Vec<_> = view
        .entries
        .iter()
        .map(|e| (e.name.as_str(), e.depth, e.kind, e.size))
        .collect();
    assert_eq!(
        rows,
        [
            ("top.md", 0, EntryType::File, 2),
            ("docs", 0, EntryType::Directory, 10),
            ("a.txt", 1, EntryType::File, 10),
            ("sub", 1, EntryType::Directory, 0),
        ]
    );
}

#[test]
fn test_help_lists_and_documents() {
    let drive = drive_with(owner());
    let (mut session, transcript) = session(&drive);

    dispatch(&mut session, "help");
    let Some(Output::List(list)) = transcript.outputs().pop() else {
        panic!("expected a list");
    };
    let groups: Vec<_> = list.groups.iter().filter_map(|g| g.label.as_deref()).collect();
    assert_eq!(groups, ["System.", "Management.", "File system.", "Debug."]);
    assert_eq!(list.groups.iter().map(|g| g.items.len()).sum::<usize>(), 21);

    dispatch(&mut session, "? rm");
    let Some(Output::CommandHelp(doc)) = transcript.outputs().pop() else {
        panic!("expected command help");
    };
    assert_eq!(doc.name, "remove");
    assert_eq!(doc.aliases, ["rm", "del", "delete"]);
    assert_eq!(doc.rank, Some(Rank::Write));

    dispatch(&mut session, "help nope");
    assert!(last_error(&transcript).contains("`nope`"));
}

// ============================================================================
// Management
// ============================================================================

#[test]
fn test_members_are_grouped() {
    let drive = drive_with(owner());
    let (mut session, transcript) = session(&drive);
    dispatch(&mut session, "members yes");

    let Some(Output::List(list)) = transcript.outputs().pop() else {
        panic!("expected a list");
    };
    assert_eq!(list.title, "family's members.");
    assert_eq!(list.groups[0].label.as_deref(), Some("Registered: 4"));
    assert_eq!(list.groups[1].label.as_deref(), Some("Unregistered: 1"));
    let amy = &list.groups[0].items[1];
    assert_eq!((amy.label.as_str(), amy.detail.as_deref()), ("amy", Some("101")));
    assert_eq!(amy.rank, Some(Rank::Read));
    assert!(list.groups[1].items[0].dimmed);
}

#[test]
fn test_owner_manages_permissions() {
    let drive = drive_with(owner());
    let (mut session, transcript) = session(&drive);

    dispatch(&mut session, "perms amy RW");
    assert_eq!(
        drive.member_permissions(1, 101),
        Some(Permissions::none().with_read(true).with_write(true))
    );

    dispatch(&mut session, "perms 101 a");
    assert_eq!(drive.member_permissions(1, 101).map(|p| p.rank()), Some(Rank::Admin));
    assert!(transcript.errors().is_empty(), "{:?}", transcript.errors());

    dispatch(&mut session, "perms me r");
    assert_eq!(last_error(&transcript), "you cannot change your own permissions");
    dispatch(&mut session, "perms root r");
    assert!(last_error(&transcript).contains("Owner permissions"));
    dispatch(&mut session, "perms guest r");
    assert!(last_error(&transcript).contains("not registered"));
    dispatch(&mut session, "perms nobody r");
    assert_eq!(last_error(&transcript), "member not found: `nobody`");
    dispatch(&mut session, "perms amy rx");
    assert_eq!(last_error(&transcript), "invalid privilege indicator: `x`");
}

#[test]
fn test_admin_limits() {
    let drive = drive_with(Permissions::none().with_admin(true));
    let (mut session, transcript) = session(&drive);

    dispatch(&mut session, "perms boss r");
    assert!(last_error(&transcript).contains("only the Owner"));
    dispatch(&mut session, "perms amy a");
    assert_eq!(last_error(&transcript), "only the Owner can grant Admin permissions");
    assert_eq!(
        drive.member_permissions(1, 101),
        Some(Permissions::none().with_read(true))
    );

    dispatch(&mut session, "perms amy w");
    assert_eq!(drive.member_permissions(1, 101).map(|p| p.rank()), Some(Rank::Write));
}

#[test]
fn test_switch_reinitializes() {
    let drive = drive_with(owner()).with_instance(
        Instance::new(2, "work"),
        Permissions::none().with_read(true),
    );
    let frontend = ScriptedFrontend::new().with_choice(1).with_choice(2);
    let (mut session, _) = start(&drive, frontend, config()).unwrap();
    assert_eq!(session.instance().name, "family");
    dispatch(&mut session, "cd docs");

    dispatch(&mut session, "switch");
    assert_eq!(session.instance().name, "work");
    assert_eq!(session.rank(), Rank::Read);
    assert_eq!(session.cwd_path(), "~/");
    assert!(session.tree().unwrap().resolve(session.cwd(), "docs").is_err());
}

#[test]
fn test_cancelled_switch_keeps_instance() {
    let drive = drive_with(owner()).with_instance(Instance::new(2, "work"), owner());
    let frontend = ScriptedFrontend::new().with_choice(1);
    let (mut session, transcript) = start(&drive, frontend, config()).unwrap();

    dispatch(&mut session, "switch");
    assert_eq!(session.instance().name, "family");
    assert_eq!(last_error(&transcript), "instance selection was cancelled");
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_read_shows_content() {
    let drive = drive_with(owner());
    let (mut session, transcript) = session(&drive);
    dispatch(&mut session, "cat docs/a.txt");
    assert_eq!(
        transcript.outputs().pop(),
        Some(Output::FileContent {
            name: "a.txt".into(),
            text: "0123456789".into(),
        })
    );
}

#[test]
fn test_download_never_clobbers_by_default() {
    let tmp = tempfile::tempdir().unwrap();
    let drive = drive_with(owner());
    let config = SessionConfig {
        downloads_dir: tmp.path().join("dl"),
        ..config()
    };
    let (mut session, transcript) = start(&drive, ScriptedFrontend::new(), config).unwrap();

    dispatch(&mut session, "download docs/a.txt");
    dispatch(&mut session, "pull docs/a.txt");
    dispatch(&mut session, "get docs/a.txt yes");
    assert!(transcript.errors().is_empty(), "{:?}", transcript.errors());

    let saved = tmp.path().join("dl").join("family");
    assert_eq!(fs::read_dir(&saved).unwrap().count(), 2);
    assert_eq!(fs::read_to_string(saved.join("a.txt")).unwrap(), "0123456789");
    assert_eq!(transcript.successes().last().unwrap(), "Downloaded: a.txt");
}

#[test]
fn test_edit_uploads_or_cancels() {
    let drive = drive_with(owner());
    let frontend = ScriptedFrontend::new()
        .with_edit(Some("changed"))
        .with_edit(None);
    let (mut session, transcript) = start(&drive, frontend, config()).unwrap();

    dispatch(&mut session, "edit docs/a.txt");
    assert_eq!(drive.file_content(1, "~/docs/a.txt").as_deref(), Some("changed"));

    dispatch(&mut session, "write docs/a.txt");
    assert_eq!(last_error(&transcript), "edit operation cancelled");
    assert_eq!(drive.file_content(1, "~/docs/a.txt").as_deref(), Some("changed"));
}

#[test]
fn test_push_uploads_into_cwd() {
    let tmp = tempfile::tempdir().unwrap();
    let local = tmp.path().join("photo notes.txt");
    fs::write(&local, b"local bytes").unwrap();

    let drive = drive_with(owner());
    let (mut session, transcript) = session(&drive);
    dispatch(&mut session, "cd docs");
    dispatch(&mut session, &format!("push \"{}\"", local.display()));

    assert_eq!(
        drive.file_content(1, "~/docs/photo notes.txt").as_deref(),
        Some("local bytes")
    );
    assert!(session.tree().unwrap().resolve(session.cwd(), "photo notes.txt").is_ok());

    dispatch(&mut session, &format!("push \"{}\"", tmp.path().join("nope").display()));
    assert!(last_error(&transcript).starts_with("local file not found"));
}

// ============================================================================
// Debug
// ============================================================================

#[test]
fn test_trace_requires_a_file() {
    let drive = drive_with(owner());
    let (mut session, transcript) = session(&drive);

    dispatch(&mut session, "cd docs");
    dispatch(&mut session, "trace a.txt");
    let Some(Output::Trace { hops }) = transcript.outputs().pop() else {
        panic!("expected a trace");
    };
    assert_eq!(hops[0].id, "header");

    dispatch(&mut session, "trace sub");
    assert_eq!(last_error(&transcript), "`sub` is a directory, file expected");
    dispatch(&mut session, "trace ghost.txt");
    assert_eq!(last_error(&transcript), "invalid path: ghost.txt");
}

#[test]
fn test_usage_and_cache() {
    let drive = drive_with(owner());
    let (mut session, transcript) = session(&drive);

    dispatch(&mut session, "usage");
    dispatch(&mut session, "cache 0");
    dispatch(&mut session, "recache 7");

    let outputs = transcript.outputs();
    assert!(outputs.contains(&Output::info("Total memory used: 12b")));
    assert!(outputs.iter().any(|o| matches!(
        o,
        Output::FileContent { name, .. } if name == "data_0 bucket cache"
    )));
    assert_eq!(last_error(&transcript), "Bucket not found: 7");
}
