use std::path::PathBuf;

use blockwise::config::{ConfigFlags, load_config_flags, parse_flag_tokens};

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".blockwiserc");
    let content = r#"
# comment
--pretty

--types quote.json
   
--debug-log=dispatch.log
"#;
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert!(flags.pretty);
    assert_eq!(flags.types, vec![PathBuf::from("quote.json")]);
    assert_eq!(flags.debug_log, Some(PathBuf::from("dispatch.log")));
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".blockwiserc");
    let content = "--pretty\n--types quote.json\n--debug-log file.log\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_args = vec![
        "blockwise".to_string(),
        "--types".to_string(),
        "code.json".to_string(),
        "--no-builtins".to_string(),
        "doc.json".to_string(),
    ];
    let cli_flags = parse_flag_tokens(&cli_args);

    let effective = file_flags.union(&cli_flags);
    assert!(effective.pretty, "file flags should remain enabled");
    assert!(effective.no_builtins, "cli flags should be applied");
    assert_eq!(
        effective.types,
        vec![PathBuf::from("quote.json"), PathBuf::from("code.json")],
        "cli type files register after file ones"
    );
    assert_eq!(
        effective.debug_log,
        Some(PathBuf::from("file.log")),
        "file config should be preserved when CLI does not override"
    );
}

#[test]
fn test_parse_flag_tokens_handles_equals_syntax() {
    let args = vec![
        "blockwise".to_string(),
        "--types=quote.json".to_string(),
        "--debug-log=dispatch.log".to_string(),
    ];
    let flags = parse_flag_tokens(&args);
    assert_eq!(flags.types, vec![PathBuf::from("quote.json")]);
    assert_eq!(flags.debug_log, Some(PathBuf::from("dispatch.log")));
}

#[test]
fn test_config_union_merges_booleans() {
    let file = ConfigFlags {
        pretty: true,
        ..ConfigFlags::default()
    };
    let cli = ConfigFlags {
        no_builtins: true,
        perf: true,
        ..ConfigFlags::default()
    };
    let merged = file.union(&cli);
    assert!(merged.pretty);
    assert!(merged.no_builtins);
    assert!(merged.perf);
}
