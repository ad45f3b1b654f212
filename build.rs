use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_LOCALE: &str = "en-US";

fn main() {
    println!("cargo:rerun-if-changed=locales");

    let manifest_dir =
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo"));
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    let locales = collect_locales(&manifest_dir.join("locales"));
    let generated = render_tables(&locales);

    fs::write(out_dir.join("authflow_i18n_generated.rs"), generated)
        .expect("failed to write generated i18n tables");
}

fn collect_locales(dir: &Path) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut locales = BTreeMap::new();
    let entries = fs::read_dir(dir).expect("locales directory must exist");

    for entry in entries {
        let path = entry.expect("failed to read locales directory entry").path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
            continue;
        }
        let tag = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .expect("locale file name must be valid UTF-8")
            .to_string();
        let content = fs::read_to_string(&path)
            .unwrap_or_else(|error| panic!("failed to read {}: {error}", path.display()));
        let table = content
            .parse::<toml::Table>()
            .unwrap_or_else(|error| panic!("invalid TOML in {}: {error}", path.display()));

        let mut entries = BTreeMap::new();
        flatten_table(&table, String::new(), &mut entries);
        locales.insert(tag, entries);
    }

    locales
}

fn flatten_table(table: &toml::Table, prefix: String, output: &mut BTreeMap<String, String>) {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(nested) => flatten_table(nested, full_key, output),
            toml::Value::String(text) => {
                output.insert(full_key, text.clone());
            }
            other => panic!("locale entry {full_key} must be a string, found {other:?}"),
        }
    }
}

fn render_tables(locales: &BTreeMap<String, BTreeMap<String, String>>) -> String {
    let mut output = String::new();
    output.push_str("pub const DEFAULT_LOCALE: &str = ");
    output.push_str(&format!("{DEFAULT_LOCALE:?};\n\n"));

    for (index, entries) in locales.values().enumerate() {
        output.push_str(&format!(
            "static ENTRIES_{index}: [(&str, &str); {}] = [\n",
            entries.len()
        ));
        for (key, value) in entries {
            output.push_str(&format!("    ({key:?}, {value:?}),\n"));
        }
        output.push_str("];\n\n");
    }

    output.push_str(&format!(
        "pub static LOCALES: [(&str, &[(&str, &str)]); {}] = [\n",
        locales.len()
    ));
    for (index, tag) in locales.keys().enumerate() {
        output.push_str(&format!("    ({tag:?}, &ENTRIES_{index}),\n"));
    }
    output.push_str("];\n");
    output
}
