use std::fs;
use std::path::Path;

use mail_helpers::i18n::Translator;

fn write_lang(dir: &Path, code: &str, json: &str) {
    fs::write(dir.join(format!("{code}.json")), json).unwrap();
}

#[test]
fn known_key_translates_unknown_key_echoes() {
    let dir = tempfile::tempdir().unwrap();
    write_lang(dir.path(), "de", r#"{"greeting": "Hallo"}"#);

    let t = Translator::new(dir.path(), "de");
    assert_eq!(t.lookup("greeting"), "Hallo");
    assert_eq!(t.lookup("missing"), "missing");
}

#[test]
fn empty_table_returns_every_key_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let t = Translator::new(dir.path(), "xx");
    for key in ["hello", "", "with spaces", "ünïcödé", "a.b.c"] {
        assert_eq!(t.lookup(key), key);
    }
}

#[test]
fn switching_language_discards_previous_table() {
    let dir = tempfile::tempdir().unwrap();
    write_lang(dir.path(), "de", r#"{"hello": "Hallo", "bye": "Tschüss"}"#);
    write_lang(dir.path(), "en", r#"{"bye": "Goodbye"}"#);

    let mut t = Translator::new(dir.path(), "de");
    assert_eq!(t.lookup("hello"), "Hallo");

    t.set_language("en");
    assert_eq!(t.language(), "en");
    assert_eq!(t.lookup("hello"), "hello");
    assert_eq!(t.lookup("bye"), "Goodbye");
}

#[test]
fn switching_to_missing_language_clears_table() {
    let dir = tempfile::tempdir().unwrap();
    write_lang(dir.path(), "de", r#"{"hello": "Hallo"}"#);

    let mut t = Translator::new(dir.path(), "de");
    t.set_language("fr");
    assert_eq!(t.lookup("hello"), "hello");
}

#[test]
fn set_language_rereads_the_file() {
    let dir = tempfile::tempdir().unwrap();
    write_lang(dir.path(), "de", r#"{"hello": "Hallo"}"#);
    let mut t = Translator::new(dir.path(), "de");

    write_lang(dir.path(), "de", r#"{"hello": "Servus"}"#);
    t.set_language("de");
    assert_eq!(t.lookup("hello"), "Servus");
}

#[test]
fn available_languages_lists_json_files_sorted() {
    let dir = tempfile::tempdir().unwrap();
    write_lang(dir.path(), "en", "{}");
    write_lang(dir.path(), "de", "{}");
    fs::write(dir.path().join("README.txt"), "not a language").unwrap();

    let t = Translator::new(dir.path(), "de");
    assert_eq!(t.available_languages(), ["de", "en"]);
}
