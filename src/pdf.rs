use crate::errors::AppError;
use crate::paths::ensure_parent_dir;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};

const PAGE_WIDTH: i64 = 595; // A4 portrait, points
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const FONT_SIZE: i64 = 11;
const LEADING: i64 = 14;
const MAX_LINE_CHARS: usize = 90;
const LINES_PER_PAGE: usize = 50;

/// Helvetica has no glyphs outside Latin-1; anything else renders as '?'.
fn sanitize_line(line: &str) -> String {
    line.chars()
        .map(|c| match c {
            '\t' => ' ',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '?',
        })
        .collect()
}

fn wrap_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        let line = sanitize_line(raw);
        if line.len() <= MAX_LINE_CHARS {
            lines.push(line);
            continue;
        }
        let mut current = String::new();
        for word in line.split(' ') {
            if !current.is_empty() && current.len() + 1 + word.len() > MAX_LINE_CHARS {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            // A single overlong token still gets hard-split
            let mut word = word;
            while word.len() > MAX_LINE_CHARS {
                let (head, tail) = word.split_at(MAX_LINE_CHARS);
                lines.push(head.to_string());
                word = tail;
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    lines
}

/// Write `title` + `body` as a plain-text PDF at `path`. Used for both the
/// `expl_*` and `chat_*` artifacts.
pub fn write_text_pdf(path: &Path, title: &str, body: &str) -> Result<PathBuf, AppError> {
    let mut lines = vec![sanitize_line(title), String::new()];
    lines.extend(wrap_lines(body));

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page_lines in lines.chunks(LINES_PER_PAGE) {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
            Operation::new("TL", vec![LEADING.into()]),
            Operation::new("Td", vec![MARGIN.into(), (PAGE_HEIGHT - MARGIN).into()]),
        ];
        for line in page_lines {
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(line.as_str())],
            ));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| AppError::Storage(format!("Failed to encode PDF content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    ensure_parent_dir(path);
    doc.save(path)
        .map_err(|e| AppError::Storage(format!("Failed to write PDF: {}", e)))?;
    Ok(path.to_path_buf())
}
