use crate::db::IndexDb;
use crate::error::Result;
use crate::query::QueryResult;
use std::io::Write;

const DELIMITER: &str = "*********************************";
const ALTERNATIVES: &str = "symbolnames|targets|usrs|symbols|tokens";

/// Dump store contents section by section.
///
/// `query` selects one section by name; an empty query dumps everything.
/// An unknown name prints the list of alternatives. Output goes through
/// `out` so the CLI can point this at stdout and tests at a buffer.
pub fn dump(db: &IndexDb, query: &str, out: &mut impl Write) -> Result<()> {
    let mut matched = false;
    let all = query.is_empty();
    let section = |name: &str| all || query.eq_ignore_ascii_case(name);

    if section("symbolnames") {
        matched = true;
        header(out, "symbolnames")?;
        db.query_symbol_names(None, "", true, |file_id, name, locations| {
            let _ = writeln!(out, "  {name}");
            for loc in locations {
                let _ = writeln!(out, "    {file_id}: {loc}");
            }
            QueryResult::Continue
        })?;
    }

    if section("targets") {
        matched = true;
        header(out, "targets")?;
        db.query_targets(None, "", true, |file_id, usr, refs| {
            let _ = writeln!(out, "  {usr}");
            for r in refs {
                let _ = writeln!(
                    out,
                    "    {}: {} kind: {} {}",
                    file_id,
                    r.location,
                    r.kind(),
                    if r.is_definition() { "def" } else { "ref" }
                );
            }
            QueryResult::Continue
        })?;
    }

    if section("usrs") {
        matched = true;
        header(out, "usrs")?;
        db.query_usrs(None, "", true, |file_id, usr, locations| {
            let _ = writeln!(out, "  {usr}");
            for loc in locations {
                let _ = writeln!(out, "    {file_id}: {loc}");
            }
            QueryResult::Continue
        })?;
    }

    if section("symbols") {
        matched = true;
        header(out, "symbols")?;
        db.query_symbols(None, |file_id, location, info| {
            let _ = writeln!(
                out,
                "  {}: {} {} kind: {} {}",
                file_id,
                location,
                info.symbol_name,
                info.kind,
                if info.is_definition() { "def" } else { "decl" }
            );
            QueryResult::Continue
        })?;
    }

    if section("tokens") {
        matched = true;
        header(out, "tokens")?;
        db.query_tokens(None, |file_id, token_id, token| {
            let _ = writeln!(
                out,
                "  {}: #{} {} @{}+{} {:?}",
                file_id, token_id, token.location, token.offset, token.length, token.spelling
            );
            QueryResult::Continue
        })?;
    }

    if !matched {
        writeln!(out, "{ALTERNATIVES}")?;
    }

    Ok(())
}

fn header(out: &mut impl Write, name: &str) -> std::io::Result<()> {
    writeln!(out, "{DELIMITER}")?;
    writeln!(out, "{name}")?;
    writeln!(out, "{DELIMITER}")
}
