#![allow(dead_code)]

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

/// A line of text at baseline `y`, made of runs each placed at their own `x`.
pub struct Line<'a> {
    pub y: i64,
    pub runs: Vec<(i64, &'a str)>,
}

pub fn line(y: i64, runs: &[(i64, &'static str)]) -> Line<'static> {
    Line {
        y,
        runs: runs.to_vec(),
    }
}

fn build_pdf(page_operations: Vec<Vec<Operation>>) -> Result<Document, Box<dyn std::error::Error>> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids = Vec::new();
    for operations in page_operations {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| (*id).into()).collect::<Vec<_>>(),
            "Count" => i64::try_from(page_ids.len())?,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    Ok(doc)
}

/// Writes a PDF whose text runs are each positioned with `Tm`, like the
/// cells of a typeset table.
pub fn create_layout_pdf(
    path: &Path,
    pages: &[Vec<Line<'_>>],
) -> Result<(), Box<dyn std::error::Error>> {
    let page_operations = pages
        .iter()
        .map(|lines| {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
            ];
            for line in lines {
                for (x, text) in &line.runs {
                    operations.push(Operation::new(
                        "Tm",
                        vec![
                            1.into(),
                            0.into(),
                            0.into(),
                            1.into(),
                            (*x).into(),
                            line.y.into(),
                        ],
                    ));
                    operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
                }
            }
            operations.push(Operation::new("ET", vec![]));
            operations
        })
        .collect();

    let mut doc = build_pdf(page_operations)?;
    doc.save(path)?;
    Ok(())
}

/// Writes a PDF of plain lines advanced with `T*`, one `Tj` per line.
pub fn create_text_pdf(path: &Path, pages: &[Vec<&str>]) -> Result<(), Box<dyn std::error::Error>> {
    let page_operations = pages
        .iter()
        .map(|lines| {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("TL", vec![16.into()]),
                Operation::new("Td", vec![50.into(), 780.into()]),
            ];
            for (index, line) in lines.iter().enumerate() {
                operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
                if index + 1 < lines.len() {
                    operations.push(Operation::new("T*", vec![]));
                }
            }
            operations.push(Operation::new("ET", vec![]));
            operations
        })
        .collect();

    let mut doc = build_pdf(page_operations)?;
    doc.save(path)?;
    Ok(())
}

/// The inflation table used across the tests: a spanning group label over
/// two buckets, with the period column left unlabelled.
pub fn inflation_page(rows: &[(i64, &'static str, &'static str, &'static str)]) -> Vec<Line<'static>> {
    let mut lines = vec![
        line(780, &[(50, "Table 1: Perceptions on Inflation")]),
        line(750, &[(150, "Current Perception")]),
        line(735, &[(150, "-Increased"), (250, "-Decreased")]),
    ];
    for &(y, period, increased, decreased) in rows {
        lines.push(line(y, &[(50, period), (150, increased), (250, decreased)]));
    }
    lines
}
