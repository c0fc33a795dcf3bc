//! `--passes` parsing.

use crate::error::{Error, Result};
use crate::pass::Pass;
use crate::passes;

/// Parses a comma-separated list of pass aliases (or pass names) into pass
/// instances, in the order given.
///
/// An empty list and `all` select the default pipeline. Repeated entries are
/// kept once.
pub fn parse_pipeline(list: &str) -> Result<Vec<Box<dyn Pass>>> {
    let wanted: Vec<&str> = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if wanted.is_empty() || wanted == ["all"] {
        return Ok(passes::all());
    }

    let mut available: Vec<Option<Box<dyn Pass>>> = passes::all().into_iter().map(Some).collect();
    let mut out = Vec::with_capacity(wanted.len());
    for name in wanted {
        let pos = available.iter().position(|p| {
            p.as_ref()
                .is_some_and(|p| p.alias() == name || p.name() == name)
        });
        match pos {
            Some(i) => {
                if let Some(p) = available[i].take() {
                    out.push(p);
                }
            }
            None if known(name) => {}
            None => {
                return Err(Error::config(format!(
                    "unknown pass `{name}` (known: {})",
                    aliases().join(", ")
                )))
            }
        }
    }
    Ok(out)
}

/// Aliases of every pass, in default order.
pub fn aliases() -> Vec<&'static str> {
    passes::all().iter().map(|p| p.alias()).collect()
}

fn known(name: &str) -> bool {
    passes::all()
        .iter()
        .any(|p| p.alias() == name || p.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &str) -> Vec<&'static str> {
        parse_pipeline(list)
            .unwrap()
            .iter()
            .map(|p| p.alias())
            .collect()
    }

    #[test]
    fn empty_and_all_select_the_default() {
        assert_eq!(names(""), aliases());
        assert_eq!(names("all"), aliases());
    }

    #[test]
    fn aliases_and_names_mix() {
        assert_eq!(
            names("field-read, StructOfBoolsToFlags,field-read"),
            vec!["field-read", "struct-flags"]
        );
    }

    #[test]
    fn unknown_alias_names_the_offender() {
        let err = parse_pipeline("struct-flags,bogus").err().unwrap();
        assert!(err.to_string().contains("bogus"));
        assert_eq!(err.exit_code(), 2);
    }
}
