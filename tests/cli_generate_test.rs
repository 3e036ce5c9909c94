//! Integration tests for header generation.

mod common;

use common::TestEnv;
use predicates::prelude::*;

const SCHEMA: &str = "\
mainmenu \"Demo\"

config FOO
\tbool \"Enable foo\"

config BAR
\tstring \"Bar name\"
\tdefault \"none\"

config BAZ
\thex \"Base address\"
\tdefault 0x1000

config QUX
\tbool \"Qux\"
\tdefault y
";

const VALUES: &str = "\
CONFIG_FOO=y
CONFIG_BAR=\"world\"
CONFIG_BAZ=ff
# CONFIG_QUX is not set
";

fn setup() -> TestEnv {
    let env = TestEnv::new();
    env.write("Kconfig", SCHEMA);
    env.write(".config", VALUES);
    env
}

// ==================== Success ====================

#[test]
fn test_generate_end_to_end() {
    let env = setup();
    env.kh()
        .args(["Kconfig", ".config", "config.h"])
        .assert()
        .success()
        .stdout(predicate::str::diff("Configuration header written to config.h.\n"));

    assert_eq!(
        env.read("config.h"),
        "/* Generated by kconfig-header */\n\
         #ifndef HV_KCONFIG\n\
         #define HV_KCONFIG\n\
         #define CONFIG_FOO 1\n\
         #define CONFIG_BAR \"world\"\n\
         #define CONFIG_BAZ 0xffU\n\
         #endif"
    );
}

#[test]
fn test_generate_is_deterministic() {
    let env = setup();
    env.kh().args(["Kconfig", ".config", "a.h"]).assert().success();
    env.kh().args(["Kconfig", ".config", "b.h"]).assert().success();
    assert_eq!(env.read("a.h"), env.read("b.h"));
}

#[test]
fn test_generate_overwrites_existing_header() {
    let env = setup();
    env.write("config.h", &"stale\n".repeat(1000));
    env.kh().args(["Kconfig", ".config", "config.h"]).assert().success();
    let header = env.read("config.h");
    assert!(!header.contains("stale"));
    assert!(header.ends_with("#endif"));
}

#[test]
fn test_extra_arguments_are_ignored() {
    let env = setup();
    env.kh()
        .args(["Kconfig", ".config", "config.h", "extra", "more"])
        .assert()
        .success()
        .stderr(predicate::str::contains("ignoring extra arguments"));
    assert!(env.exists("config.h"));
    assert!(!env.exists("extra"));
}

#[test]
fn test_defaults_and_ranges() {
    let env = TestEnv::new();
    env.write(
        "Kconfig",
        "config CPUS\n\tint \"CPU count\"\n\trange 1 64\n\tdefault 4\n\
         config WIDE\n\tint\n\tdefault -5\n\thelp\n\t  Stored as a 64-bit integer.\n\
         config MODULES\n\tbool \"Modules\"\n\tmodules\n\
         config DRIVER\n\ttristate \"Driver\"\n",
    );
    env.write(".config", "CONFIG_CPUS=128\nCONFIG_MODULES=y\nCONFIG_DRIVER=m\n");

    env.kh()
        .args(["Kconfig", ".config", "config.h"])
        .assert()
        .success()
        .stderr(predicate::str::contains("outside range"));

    let header = env.read("config.h");
    assert!(header.contains("#define CONFIG_CPUS 4U\n"));
    assert!(header.contains("#define CONFIG_WIDE -5L\n"));
    assert!(header.contains("#define CONFIG_MODULES 1\n"));
    assert!(header.contains("#define CONFIG_DRIVER_MODULE 1\n"));
}

#[test]
fn test_string_escaping() {
    let env = TestEnv::new();
    env.write("Kconfig", "config PATH\n\tstring \"Path\"\n");
    env.write(".config", "CONFIG_PATH=\"C:\\\\dir \\\"x\\\"\"\n");

    env.kh().args(["Kconfig", ".config", "config.h"]).assert().success();
    assert!(env
        .read("config.h")
        .contains("#define CONFIG_PATH \"C:\\\\dir \\\"x\\\"\"\n"));
}

#[test]
fn test_source_relative_to_schema_dir() {
    let env = TestEnv::new();
    env.write("board/Kconfig", "source \"sub/Kconfig.sub\"\nconfig TOP\n\tdef_bool y\n");
    env.write("board/sub/Kconfig.sub", "config SUB\n\tint\n\tdefault 3\n");
    env.write(".config", "");

    env.kh()
        .args(["board/Kconfig", ".config", "config.h"])
        .assert()
        .success();
    let header = env.read("config.h");
    assert!(header.contains("#define CONFIG_SUB 3\n"));
    assert!(header.contains("#define CONFIG_TOP 1\n"));
}

#[test]
fn test_srctree_flag() {
    let env = TestEnv::new();
    env.write("Kconfig", "source \"lib/Kconfig\"\n");
    env.write("tree/lib/Kconfig", "config LIB\n\tdef_bool y\n");
    env.write(".config", "");

    env.kh()
        .args(["--srctree", "tree", "Kconfig", ".config", "config.h"])
        .assert()
        .success();
    assert!(env.read("config.h").contains("#define CONFIG_LIB 1\n"));
}

// ==================== Settings ====================

#[test]
fn test_prefix_flag() {
    let env = TestEnv::new();
    env.write("Kconfig", "config FOO\n\tbool \"foo\"\n");
    env.write(".config", "HV_FOO=y\n");

    env.kh()
        .args(["--prefix", "HV_", "Kconfig", ".config", "config.h"])
        .assert()
        .success();
    assert!(env.read("config.h").contains("#define HV_FOO 1\n"));
}

#[test]
fn test_prefix_from_environment() {
    let env = TestEnv::new();
    env.write("Kconfig", "config FOO\n\tbool \"foo\"\n");
    env.write(".config", "MY_FOO=y\n");

    env.kh()
        .env("CONFIG_", "MY_")
        .args(["Kconfig", ".config", "config.h"])
        .assert()
        .success();
    assert!(env.read("config.h").contains("#define MY_FOO 1\n"));
}

#[test]
fn test_header_comment_flag() {
    let env = setup();
    env.kh()
        .args(["--header-comment", "// custom\n", "Kconfig", ".config", "config.h"])
        .assert()
        .success();
    assert!(env.read("config.h").starts_with("// custom\n#ifndef HV_KCONFIG\n"));
}

#[test]
fn test_user_settings_file() {
    let env = setup();
    env.write_user_settings("header-comment \"/* from settings */\\n\"\n");

    env.kh().args(["Kconfig", ".config", "config.h"]).assert().success();
    assert!(env.read("config.h").starts_with("/* from settings */\n#ifndef"));
}

#[test]
fn test_environment_beats_settings_file() {
    let env = setup();
    env.write_user_settings("header-comment \"/* from settings */\\n\"\n");

    env.kh()
        .env("KCONFIG_HEADER_COMMENT", "/* from env */\n")
        .args(["Kconfig", ".config", "config.h"])
        .assert()
        .success();
    assert!(env.read("config.h").starts_with("/* from env */\n"));
}

#[test]
fn test_explicit_settings_file() {
    let env = TestEnv::new();
    env.write("Kconfig", "config FOO\n\tbool \"foo\"\n");
    env.write(".config", "X_FOO=y\n");
    env.write("settings.kdl", "prefix \"X_\"\n");

    env.kh()
        .args(["--settings", "settings.kdl", "Kconfig", ".config", "config.h"])
        .assert()
        .success();
    assert!(env.read("config.h").contains("#define X_FOO 1\n"));
}

#[test]
fn test_invalid_settings_file() {
    let env = setup();
    env.write("settings.kdl", "prefix 12\n");

    env.kh()
        .args(["--settings", "settings.kdl", "Kconfig", ".config", "config.h"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid settings"));
    assert!(!env.exists("config.h"));
}

// ==================== JSON output ====================

#[test]
fn test_json_output() {
    let env = setup();
    let output = env
        .kh()
        .args(["--json", "Kconfig", ".config", "config.h"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["output"], "config.h");
    assert_eq!(json["mainmenu"], "Demo");
    assert_eq!(json["symbols_emitted"], 3);
    assert_eq!(json["values_assigned"], 4);
    assert_eq!(json["values_ignored"], 0);
    assert_eq!(json["settings"]["prefix"]["source"], "default");
}

#[test]
fn test_json_error() {
    let env = setup();
    env.kh()
        .args(["--json", "Kconfig", "missing.config", "config.h"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(r#"{"error":"Cannot find file missing.config"}"#));
}

// ==================== Failures ====================

#[test]
fn test_missing_schema() {
    let env = setup();
    env.kh()
        .args(["NoSuchKconfig", ".config", "config.h"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::diff("Cannot find file NoSuchKconfig\n"));
    assert!(!env.exists("config.h"));
}

#[test]
fn test_missing_values() {
    let env = setup();
    env.kh()
        .args(["Kconfig", "none.config", "config.h"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Cannot find file none.config"));
    assert!(!env.exists("config.h"));
}

#[test]
fn test_directory_as_values() {
    let env = setup();
    std::fs::create_dir(env.path().join("conf.d")).unwrap();
    env.kh()
        .args(["Kconfig", "conf.d", "config.h"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::diff("Cannot find file conf.d\n"));
    assert!(!env.exists("config.h"));
}

#[test]
fn test_too_few_arguments() {
    let env = setup();
    env.kh()
        .args(["Kconfig", ".config"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains(
            "<Kconfig file> <.config file> <path to config.h>",
        ))
        .stderr(predicate::str::contains("got 2"));
    assert!(!env.exists("config.h"));
}

#[test]
fn test_malformed_schema() {
    let env = TestEnv::new();
    env.write("Kconfig", "config FOO\n\tbool \"foo\"\nif FOO\n");
    env.write(".config", "");

    env.kh()
        .args(["Kconfig", ".config", "config.h"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::starts_with("Error: "))
        .stderr(predicate::str::contains("Kconfig"));
    assert!(!env.exists("config.h"));
}

// A parsed Kconfig tree only yields typed symbols, so the unsupported type
// error cannot be reached from the binary. Its message is checked in
// library_api_test.rs.

#[test]
fn test_unwritable_output() {
    let env = setup();
    env.kh()
        .args(["Kconfig", ".config", "no/such/dir/config.h"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("IO error"));
}

#[test]
fn test_warnings_for_unknown_symbols() {
    let env = setup();
    env.write(".config", "CONFIG_FOO=y\nCONFIG_GHOST=y\n");

    env.kh()
        .args(["Kconfig", ".config", "config.h"])
        .assert()
        .success()
        .stderr(predicate::str::contains("undefined symbol CONFIG_GHOST"));
}

#[test]
fn test_log_filter_silences_warnings() {
    let env = setup();
    env.write(".config", "CONFIG_GHOST=y\n");

    env.kh()
        .env("KCONFIG_HEADER_LOG", "error")
        .args(["Kconfig", ".config", "config.h"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}
