//! # Folio CLI
//!
//! Usage:
//!   folio input.json -o pages.json
//!   echo '{ ... }' | folio --page-height 933
//!   folio contract.json --vars values.json --chars-per-page 3000
//!   folio --example > contract.json
//!
//! Set `RUST_LOG=debug` to watch page breaks and reflow moves.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

use folio::estimate::DEFAULT_CHARS_PER_PAGE;
use folio::{CharCountEstimator, Document, PageSetBuilder, RenderedPage};

/// Command-line options, all optional.
struct Options {
    input: Option<String>,
    output: Option<String>,
    page_height: Option<f64>,
    page_width: Option<f64>,
    vars: Option<String>,
    chars_per_page: Option<f64>,
}

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_contract_json());
        return;
    }

    let options = match parse_options(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("✗ {message}");
            process::exit(1);
        }
    };

    match run(&options) {
        Ok(pages) => {
            let total: f64 = pages.iter().map(|p| p.height).sum();
            eprintln!(
                "✓ {} page(s), {:.0} units of content, written to {}",
                pages.len(),
                total,
                options.output.as_deref().unwrap_or("stdout")
            );
        }
        Err(e) => {
            eprintln!("✗ {e}");
            process::exit(1);
        }
    }
}

fn run(options: &Options) -> folio::Result<Vec<RenderedPage>> {
    let input = match &options.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let mut document: Document = serde_json::from_str(&input)?;
    if let Some(path) = &options.vars {
        let values: BTreeMap<String, String> = serde_json::from_str(&fs::read_to_string(path)?)?;
        document.variables.extend(values);
    }
    if let Some(height) = options.page_height {
        document.page.page_height = height;
    }
    if let Some(width) = options.page_width {
        document.page.page_width = width;
    }

    let pages = match options.chars_per_page {
        Some(chars) => {
            document.page.page_height = chars;
            let root = folio::substitute(&document.root, &document.variables);
            PageSetBuilder::new(document.page)
                .with_estimator(CharCountEstimator)
                .build(&root)?
                .render()
        }
        None => folio::paginate(&document)?.render(),
    };

    let json = serde_json::to_string_pretty(&pages)?;
    match &options.output {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(pages)
}

fn parse_options(args: &[String]) -> Result<Options, String> {
    let flag = |name: &str| {
        args.windows(2)
            .find(|w| w[0] == name)
            .map(|w| w[1].clone())
    };
    let number = |name: &str| -> Result<Option<f64>, String> {
        flag(name)
            .map(|raw| {
                raw.parse::<f64>()
                    .map_err(|_| format!("{name} expects a number, got {raw:?}"))
            })
            .transpose()
    };

    let chars_per_page = if args.iter().any(|a| a == "--chars-per-page") {
        Some(number("--chars-per-page")?.unwrap_or(DEFAULT_CHARS_PER_PAGE))
    } else {
        None
    };

    Ok(Options {
        input: args.get(1).filter(|a| !a.starts_with('-')).cloned(),
        output: flag("-o"),
        page_height: number("--page-height")?,
        page_width: number("--page-width")?,
        vars: flag("--vars"),
        chars_per_page,
    })
}

fn example_contract_json() -> &'static str {
    r##"{
  "page": {
    "pageHeight": 933,
    "pageWidth": 623
  },
  "variables": {
    "contract_number": "SA-2026-014",
    "contract_date": "19.10.2026",
    "party_name": "Northwind Trading LLC"
  },
  "root": {
    "kind": "div",
    "attributes": { "class": "contract" },
    "children": [
      {
        "kind": "h1",
        "children": [ { "kind": "#text", "text": "Service Agreement No. ${contract_number}" } ]
      },
      {
        "kind": "p",
        "children": [
          { "kind": "#text", "text": "This agreement is made on " },
          {
            "kind": "span",
            "attributes": { "data-variable": "contract_date" },
            "children": [ { "kind": "#text", "text": "__.__.____" } ]
          },
          { "kind": "#text", "text": " between the Provider and " },
          {
            "kind": "span",
            "attributes": { "data-variable": "party_name" },
            "children": [ { "kind": "#text", "text": "________" } ]
          },
          { "kind": "#text", "text": " (the Client), who agree as follows." }
        ]
      },
      {
        "kind": "h2",
        "children": [ { "kind": "#text", "text": "1. Subject" } ]
      },
      {
        "kind": "p",
        "children": [
          { "kind": "#text", "text": "The Provider undertakes to render consulting services described in Annex 1, and the Client undertakes to accept and pay for them under the terms of this agreement. Services are rendered remotely unless the parties agree otherwise in writing." }
        ]
      },
      {
        "kind": "table",
        "children": [
          {
            "kind": "tr",
            "children": [
              { "kind": "th", "children": [ { "kind": "#text", "text": "Stage" } ] },
              { "kind": "th", "children": [ { "kind": "#text", "text": "Amount" } ] }
            ]
          },
          {
            "kind": "tr",
            "children": [
              { "kind": "td", "children": [ { "kind": "#text", "text": "Analysis" } ] },
              { "kind": "td", "children": [ { "kind": "#text", "text": "${stage_one_amount}" } ] }
            ]
          },
          {
            "kind": "tr",
            "children": [
              { "kind": "td", "children": [ { "kind": "#text", "text": "Delivery" } ] },
              { "kind": "td", "children": [ { "kind": "#text", "text": "${stage_two_amount}" } ] }
            ]
          }
        ]
      },
      {
        "kind": "h2",
        "children": [ { "kind": "#text", "text": "2. Signatures" } ]
      },
      {
        "kind": "div",
        "attributes": { "class": "signatures" },
        "children": [
          { "kind": "p", "children": [ { "kind": "#text", "text": "Provider: ____________" } ] },
          { "kind": "p", "children": [ { "kind": "#text", "text": "Client: ____________" } ] }
        ]
      }
    ]
  }
}
"##
}
