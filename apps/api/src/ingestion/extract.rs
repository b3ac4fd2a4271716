//! Best-effort text extraction from stored resume files.
//!
//! The extractor never fails to its caller: a corrupt file, a missing zip
//! entry, or a parser panic all collapse to an empty string, so the
//! orchestrator can still run field heuristics and classify the file as
//! failed locally instead of aborting the batch.

use std::io::{Cursor, Read};
use std::panic::AssertUnwindSafe;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::warn;

use crate::models::job::FileType;

/// Reads the stored file and returns its plain text. Empty string on any
/// failure.
pub async fn extract_text(path: &Path, file_type: FileType) -> String {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to read {}: {e}", path.display());
            return String::new();
        }
    };

    match file_type {
        FileType::Pdf => extract_pdf_text(&bytes),
        FileType::Docx => extract_docx_text(&bytes),
    }
}

/// PDF text via pdf-extract. The parser panics on some malformed inputs, so
/// the call is wrapped in `catch_unwind` as part of the never-throws contract.
fn extract_pdf_text(bytes: &[u8]) -> String {
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(bytes)
    }));

    match result {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!("PDF extraction failed: {e}");
            String::new()
        }
        Err(_) => {
            warn!("PDF extraction panicked on malformed input");
            String::new()
        }
    }
}

/// DOCX text from `word/document.xml` inside the zip container. `<w:t>`
/// elements carry the text runs; each closed `<w:p>` becomes a line break.
fn extract_docx_text(bytes: &[u8]) -> String {
    let cursor = Cursor::new(bytes);
    let mut archive = match zip::ZipArchive::new(cursor) {
        Ok(archive) => archive,
        Err(e) => {
            warn!("Failed to open DOCX archive: {e}");
            return String::new();
        }
    };

    let mut xml = String::new();
    match archive.by_name("word/document.xml") {
        Ok(mut entry) => {
            if let Err(e) = entry.read_to_string(&mut xml) {
                warn!("Failed to read document.xml: {e}");
                return String::new();
            }
        }
        Err(e) => {
            warn!("DOCX has no document.xml: {e}");
            return String::new();
        }
    }

    parse_docx_xml(&xml)
}

fn parse_docx_xml(xml: &str) -> String {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut text = String::new();
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_element = true;
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text_element {
                    text.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("DOCX XML parsing error: {e}");
                break;
            }
            _ => {}
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            writer
                .start_file("word/document.xml", FileOptions::default())
                .unwrap();
            writer.write_all(document_xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    const SIMPLE_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
            <w:body>
                <w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p>
                <w:p><w:r><w:t>jane.doe@corp.io</w:t></w:r></w:p>
            </w:body>
        </w:document>"#;

    #[test]
    fn test_docx_paragraphs_become_lines() {
        let text = extract_docx_text(&docx_bytes(SIMPLE_DOC));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["Jane Doe", "jane.doe@corp.io"]);
    }

    #[test]
    fn test_docx_unescapes_entities() {
        let xml = r#"<w:document xmlns:w="x"><w:body>
            <w:p><w:r><w:t>R&amp;D Engineer</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let text = extract_docx_text(&docx_bytes(xml));
        assert!(text.contains("R&D Engineer"));
    }

    #[test]
    fn test_corrupt_docx_yields_empty() {
        assert_eq!(extract_docx_text(b"not a zip archive"), "");
    }

    #[test]
    fn test_docx_without_document_xml_yields_empty() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            writer
                .start_file("other.txt", FileOptions::default())
                .unwrap();
            writer.write_all(b"hello").unwrap();
            writer.finish().unwrap();
        }
        assert_eq!(extract_docx_text(&buf.into_inner()), "");
    }

    #[test]
    fn test_corrupt_pdf_yields_empty() {
        assert_eq!(extract_pdf_text(b"%PDF-garbage not a real pdf"), "");
    }

    #[tokio::test]
    async fn test_missing_file_yields_empty() {
        let text = extract_text(Path::new("/nonexistent/resume.pdf"), FileType::Pdf).await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_extract_docx_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.docx");
        std::fs::write(&path, docx_bytes(SIMPLE_DOC)).unwrap();

        let text = extract_text(&path, FileType::Docx).await;
        assert!(text.contains("Jane Doe"));
    }
}
