//! Page pruning for PDF byte streams.

use lopdf::Document;
use thiserror::Error;

/// Errors raised while pruning pages from a PDF.
#[derive(Debug, Error)]
pub enum PdfError {
    /// Input bytes were not a well-formed PDF document.
    #[error("input bytes are not a well-formed PDF: {0}")]
    Malformed(lopdf::Error),
    /// A requested page does not exist in the document.
    #[error("page {page} is out of range for a document with {page_count} pages")]
    PageOutOfRange {
        /// 1-indexed page number that was requested.
        page: u32,
        /// Number of pages actually present.
        page_count: usize,
    },
    /// The pruned document could not be serialized back to bytes.
    #[error("failed to serialize pruned document: {0}")]
    Save(std::io::Error),
}

/// Remove the given 1-indexed pages from a PDF byte stream.
///
/// Page numbers always refer to the document as it arrived: the list is
/// sorted and deduplicated, then removed in one pass against the original
/// numbering, so callers never have to account for indices shifting as
/// earlier pages disappear. An empty list returns the input unchanged.
pub fn prune_pages(bytes: &[u8], pages: &[u32]) -> Result<Vec<u8>, PdfError> {
    if pages.is_empty() {
        return Ok(bytes.to_vec());
    }

    let mut document = Document::load_mem(bytes).map_err(PdfError::Malformed)?;
    let page_count = document.get_pages().len();

    let mut targets: Vec<u32> = pages.to_vec();
    targets.sort_unstable();
    targets.dedup();
    for &page in &targets {
        if page == 0 || page as usize > page_count {
            return Err(PdfError::PageOutOfRange { page, page_count });
        }
    }

    document.delete_pages(&targets);

    let mut pruned = Vec::new();
    document.save_to(&mut pruned).map_err(PdfError::Save)?;
    tracing::debug!(
        removed = targets.len(),
        remaining = page_count - targets.len(),
        "Pruned pages from source document"
    );
    Ok(pruned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    /// Build a minimal PDF with the requested number of pages.
    fn sample_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for index in 0..pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new(
                        "Tj",
                        vec![Object::string_literal(format!("Page {}", index + 1))],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("encode content"),
            ));
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
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("serialize sample pdf");
        bytes
    }

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes)
            .expect("load pruned pdf")
            .get_pages()
            .len()
    }

    #[test]
    fn pruning_removes_exactly_the_requested_pages() {
        let pdf = sample_pdf(3);
        let pruned = prune_pages(&pdf, &[2]).expect("prune succeeds");
        assert_eq!(page_count(&pruned), 2);
    }

    #[test]
    fn pruning_multiple_pages_uses_original_numbering() {
        let pdf = sample_pdf(5);
        let pruned = prune_pages(&pdf, &[1, 3, 5]).expect("prune succeeds");
        assert_eq!(page_count(&pruned), 2);
    }

    #[test]
    fn pruning_ignores_duplicate_page_numbers() {
        let pdf = sample_pdf(4);
        let pruned = prune_pages(&pdf, &[2, 2, 4]).expect("prune succeeds");
        assert_eq!(page_count(&pruned), 2);
    }

    #[test]
    fn empty_page_list_passes_bytes_through_unchanged() {
        let pdf = sample_pdf(3);
        let pruned = prune_pages(&pdf, &[]).expect("prune succeeds");
        assert_eq!(pruned, pdf);
    }

    #[test]
    fn out_of_range_page_is_rejected() {
        let pdf = sample_pdf(3);
        let error = prune_pages(&pdf, &[4]).expect_err("page 4 of 3");
        assert!(matches!(
            error,
            PdfError::PageOutOfRange {
                page: 4,
                page_count: 3
            }
        ));
    }

    #[test]
    fn page_zero_is_rejected() {
        let pdf = sample_pdf(3);
        let error = prune_pages(&pdf, &[0]).expect_err("pages are 1-indexed");
        assert!(matches!(error, PdfError::PageOutOfRange { page: 0, .. }));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let error = prune_pages(b"not a pdf at all", &[1]).expect_err("invalid input");
        assert!(matches!(error, PdfError::Malformed(_)));
    }
}
