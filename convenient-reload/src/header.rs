//! Interprets the leading form of a source file as a module header.

use crate::reader::{Form, ReadError, Reader};
use crate::types::ModuleName;

/// Raw header of one source file, before reference resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    /// `(ns name ...)`
    Primary {
        /// Declared module
        name: ModuleName,
        /// Every module referenced by a require-like clause, in source order
        references: Vec<ModuleName>,
        /// Resource paths from `(:resources ...)`, relative to a root
        resources: Vec<String>,
    },
    /// `(in-ns 'name)`
    Secondary {
        /// Module whose context the file switches into
        name: ModuleName,
    },
    /// No header: empty file or a leading form that is not a declaration
    Absent,
}

/// Clauses whose libspecs name modules the declaring module depends on.
const REQUIRE_CLAUSES: &[&str] = &["require", "use", "require-macros", "use-macros"];
const RESOURCE_CLAUSE: &str = "resources";

/// Parse the header of `source`.
///
/// # Errors
///
/// Returns a [`ReadError`] (byte offset + message) if the leading form is
/// lexically malformed, or if it is an `ns`/`in-ns` form of the wrong shape.
pub fn parse_header(source: &str, features: &[String]) -> Result<Header, ReadError> {
    let mut reader = Reader::new(source, features);
    let Some(form) = reader.read_leading()? else {
        return Ok(Header::Absent);
    };
    let offset = reader.leading_offset();
    let malformed = |message: &str| ReadError {
        offset,
        message: message.to_string(),
    };

    let Form::List(items) = form else {
        return Ok(Header::Absent);
    };
    let Some((head, args)) = items.split_first() else {
        return Ok(Header::Absent);
    };

    match head.as_symbol() {
        Some("ns") => {
            let Some((name, clauses)) = args.split_first() else {
                return Err(malformed("ns form is missing a module name"));
            };
            let Some(name) = name.as_symbol() else {
                return Err(malformed("ns module name must be a symbol"));
            };

            let mut references = Vec::new();
            let mut resources = Vec::new();
            for clause in clauses {
                read_clause(clause, &mut references, &mut resources).map_err(|m| malformed(&m))?;
            }

            Ok(Header::Primary {
                name: ModuleName::new(name),
                references,
                resources,
            })
        }
        Some("in-ns") => match args {
            [Form::Quoted(inner)] => match inner.as_ref() {
                Form::Symbol(name) => Ok(Header::Secondary {
                    name: ModuleName::new(name.as_str()),
                }),
                _ => Err(malformed("in-ns expects a quoted symbol")),
            },
            [Form::List(quote)] => match quote.as_slice() {
                [Form::Symbol(q), Form::Symbol(name)] if q == "quote" => Ok(Header::Secondary {
                    name: ModuleName::new(name.as_str()),
                }),
                _ => Err(malformed("in-ns expects a quoted symbol")),
            },
            _ => Err(malformed("in-ns expects exactly one quoted symbol")),
        },
        _ => Ok(Header::Absent),
    }
}

fn read_clause(
    clause: &Form,
    references: &mut Vec<ModuleName>,
    resources: &mut Vec<String>,
) -> Result<(), String> {
    match clause {
        // docstring and attribute map
        Form::Str(_) | Form::Map(_) => Ok(()),
        // `(:require ...)`, `(require ...)` and `[:require ...]` all name the same clause
        Form::List(items) | Form::Vector(items) => {
            let Some((kind, specs)) = items.split_first() else {
                return Err("empty ns clause".to_string());
            };
            let Some(kind) = kind.as_keyword().or_else(|| kind.as_symbol()) else {
                return Err(format!("ns clause must start with a keyword, found {kind:?}"));
            };

            if REQUIRE_CLAUSES.contains(&kind) {
                for spec in specs {
                    read_libspec(spec, None, references)?;
                }
            } else if kind == RESOURCE_CLAUSE {
                for spec in specs {
                    let Form::Str(path) = spec else {
                        return Err(format!("resource path must be a string, found {spec:?}"));
                    };
                    resources.push(path.clone());
                }
            }
            Ok(())
        }
        other => Err(format!("unexpected ns clause {other:?}")),
    }
}

fn read_libspec(
    spec: &Form,
    prefix: Option<&str>,
    references: &mut Vec<ModuleName>,
) -> Result<(), String> {
    let join = |name: &str| match prefix {
        Some(prefix) => ModuleName::new(format!("{prefix}.{name}")),
        None => ModuleName::new(name),
    };

    match spec {
        Form::Symbol(name) => {
            references.push(join(name));
            Ok(())
        }
        Form::Quoted(inner) => read_libspec(inner, prefix, references),
        // flags like :reload, and string libspecs of foreign packages
        Form::Keyword(_) | Form::Str(_) => Ok(()),
        Form::Vector(items) => {
            let Some((first, rest)) = items.split_first() else {
                return Err("empty libspec vector".to_string());
            };
            let Some(name) = first.as_symbol() else {
                return Err(format!("libspec must start with a symbol, found {first:?}"));
            };
            let is_prefix_list = rest
                .first()
                .is_some_and(|f| matches!(f, Form::Symbol(_) | Form::Vector(_)));
            if is_prefix_list {
                let name = join(name);
                for child in rest {
                    read_libspec(child, Some(name.as_str()), references)?;
                }
            } else {
                references.push(join(name));
            }
            Ok(())
        }
        Form::List(items) => {
            let Some((first, rest)) = items.split_first() else {
                return Err("empty prefix list".to_string());
            };
            let Some(name) = first.as_symbol() else {
                return Err(format!("prefix list must start with a symbol, found {first:?}"));
            };
            let name = join(name);
            for child in rest {
                read_libspec(child, Some(name.as_str()), references)?;
            }
            Ok(())
        }
        other => Err(format!("unsupported libspec {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<Header, ReadError> {
        parse_header(source, &["clj".to_string()])
    }

    fn names(list: &[&str]) -> Vec<ModuleName> {
        list.iter().map(|n| ModuleName::from(*n)).collect()
    }

    #[test]
    fn test_primary_with_all_libspec_shapes() {
        let source = r#"
;; app entry point
(ns app.core
  "The core."
  {:author "someone"}
  (:require app.util
            [app.db :as db]
            [app.http server [routes :as r]]
            (app.model user order)
            [clojure.string :as str]
            "left-pad")
  (:use [app.legacy])
  (:import (java.util Date))
  (:resources "templates/page.html" "config.edn"))

(defn -main [] (println "hi"))
"#;
        let header = parse(source).unwrap();
        assert_eq!(
            header,
            Header::Primary {
                name: "app.core".into(),
                references: names(&[
                    "app.util",
                    "app.db",
                    "app.http.server",
                    "app.http.routes",
                    "app.model.user",
                    "app.model.order",
                    "clojure.string",
                    "app.legacy",
                ]),
                resources: vec!["templates/page.html".to_string(), "config.edn".to_string()],
            }
        );
    }

    #[test]
    fn test_reader_conditional_requires() {
        let source = "(ns app.shared (:require #?(:clj [app.jvm] :cljs [app.js]) app.common))";
        let Header::Primary { references, .. } = parse(source).unwrap() else {
            panic!("expected primary declaration");
        };
        assert_eq!(references, names(&["app.jvm", "app.common"]));
    }

    #[test]
    fn test_symbol_and_vector_clause_heads() {
        for source in [
            "(ns a (require b [c.d :as d]))",
            "(ns a [:require b [c.d :as d]])",
            "(ns a [require b (c d)])",
        ] {
            let Header::Primary { references, .. } = parse(source).unwrap() else {
                panic!("expected primary declaration for {source}");
            };
            assert_eq!(references, names(&["b", "c.d"]), "{source}");
        }

        let Header::Primary { resources, .. } = parse("(ns a (resources \"x.edn\"))").unwrap()
        else {
            panic!("expected primary declaration");
        };
        assert_eq!(resources, vec!["x.edn".to_string()]);
    }

    #[test]
    fn test_shebang_line_before_header() {
        let header = parse("#!/usr/bin/env bb\n(ns a (:require b))").unwrap();
        assert_eq!(
            header,
            Header::Primary {
                name: "a".into(),
                references: names(&["b"]),
                resources: Vec::new(),
            }
        );
    }

    #[test]
    fn test_secondary_forms() {
        assert_eq!(
            parse("(in-ns 'app.core)\n(def x 1)").unwrap(),
            Header::Secondary {
                name: "app.core".into()
            }
        );
        assert_eq!(
            parse("(in-ns (quote app.core))").unwrap(),
            Header::Secondary {
                name: "app.core".into()
            }
        );
    }

    #[test]
    fn test_absent_headers() {
        assert_eq!(parse("").unwrap(), Header::Absent);
        assert_eq!(parse(";; just a comment").unwrap(), Header::Absent);
        assert_eq!(parse("(def x 1)\n(ns late)").unwrap(), Header::Absent);
        assert_eq!(parse("42").unwrap(), Header::Absent);
        assert_eq!(parse("()").unwrap(), Header::Absent);
    }

    #[test]
    fn test_malformed_headers() {
        assert!(parse("(ns)").is_err());
        assert!(parse("(ns \"name\")").is_err());
        assert!(parse("(ns 42)").is_err());
        assert!(parse("(ns a (42 b))").is_err());
        assert!(parse("(ns a [])").is_err());
        assert!(parse("(ns a (:require 42))").is_err());
        assert!(parse("(ns a (:resources page))").is_err());
        assert!(parse("(in-ns app.core)").is_err());
        assert!(parse("(in-ns 'a 'b)").is_err());
        assert!(parse("(ns a (:require [b)").is_err());
    }

    #[test]
    fn test_error_offset_points_at_leading_form() {
        let err = parse(";; header\n\n(ns)").unwrap_err();
        assert_eq!(err.offset, 11);
    }
}
