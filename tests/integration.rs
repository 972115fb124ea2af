//! Integration tests for the PDF stamper library

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use pdf_stamper::batch::{run_batch, BatchLayout};
use pdf_stamper::pdf::{add_images_to_pdf, count_pages, OverlayAssets};
use pdf_stamper::{Error, Resource};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const LETTER: [i64; 4] = [0, 0, 612, 792];

/// Write a PDF whose pages each draw a marker rectangle at x = 10 * page number
///
/// The page tree carries a Letter MediaBox; pages with `Some` override it.
fn write_pdf(path: &Path, page_boxes: &[Option<[i64; 4]>]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for (i, page_box) in page_boxes.iter().enumerate() {
        let marker = format!("0 0 1 rg {} 10 5 5 re f\n", (i as i64 + 1) * 10);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), marker.into_bytes()));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        };
        if let Some(corners) = page_box {
            page.set("MediaBox", corners.iter().map(|&n| Object::Integer(n)).collect::<Vec<_>>());
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    doc.objects.insert(pages_id, Object::Dictionary(dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_boxes.len() as i64,
        "MediaBox" => LETTER.iter().map(|&n| Object::Integer(n)).collect::<Vec<_>>(),
    }));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("Failed to write fixture PDF");
}

/// Write header.jpg, watermark.png and footer.jpg into `dir`
fn write_images(dir: &Path) -> OverlayAssets {
    fs::create_dir_all(dir).unwrap();
    let assets = OverlayAssets::in_dir(dir);
    RgbImage::from_pixel(34, 8, Rgb([20, 40, 160])).save(&assets.header).unwrap();
    RgbImage::from_pixel(60, 6, Rgb([90, 90, 90])).save(&assets.footer).unwrap();
    RgbaImage::from_pixel(16, 16, Rgba([200, 0, 0, 128])).save(&assets.watermark).unwrap();
    assets
}

fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

fn page_operations(doc: &Document, page_id: ObjectId) -> Vec<Operation> {
    Content::decode(&doc.get_page_content(page_id).unwrap())
        .unwrap()
        .operations
}

fn operands(op: &Operation) -> Vec<f32> {
    op.operands.iter().map(|o| o.as_float().unwrap()).collect()
}

/// Operand lists of every `cm` on the page
fn placements(doc: &Document, page_id: ObjectId) -> Vec<Vec<f32>> {
    page_operations(doc, page_id)
        .iter()
        .filter(|op| op.operator == "cm")
        .map(operands)
        .collect()
}

fn assert_placed(placements: &[Vec<f32>], expected: [f32; 6]) {
    let found = placements.iter().any(|m| {
        m.len() == 6 && m.iter().zip(expected.iter()).all(|(a, b)| (a - b).abs() < 0.01)
    });
    assert!(found, "No placement {:?} in {:?}", expected, placements);
}

#[test]
fn test_stamp_preserves_pages_and_order() {
    let temp = TempDir::new().unwrap();
    let assets = write_images(&temp.path().join("images"));
    let input = temp.path().join("input.pdf");
    let output = temp.path().join("output.pdf");
    write_pdf(&input, &[None, None, None]);

    let report = add_images_to_pdf(&input, &output, &assets, &temp.path().join("temp_files")).unwrap();
    assert_eq!(report.page_count, 3);
    assert!(report.watermark_applied);
    assert_eq!(count_pages(&output).unwrap(), 3);

    let doc = Document::load(&output).unwrap();
    for (i, page_id) in page_ids(&doc).into_iter().enumerate() {
        let ops = page_operations(&doc, page_id);
        assert_eq!(ops[0].operator, "q", "Original content must be wrapped on page {}", i + 1);

        let marker = ops.iter().position(|op| op.operator == "re").unwrap();
        let expected_x = ((i + 1) * 10) as f32;
        assert_eq!(operands(&ops[marker]), vec![expected_x, 10.0, 5.0, 5.0]);

        // Original drawing comes before every image placement
        let first_draw = ops.iter().position(|op| op.operator == "Do").unwrap();
        assert!(marker < first_draw);
        assert_eq!(ops.iter().filter(|op| op.operator == "Do").count(), 3);
    }
}

#[test]
fn test_indirect_contents_array_survives_stamping() {
    let temp = TempDir::new().unwrap();
    let assets = write_images(&temp.path().join("images"));
    let input = temp.path().join("input.pdf");
    let output = temp.path().join("output.pdf");
    write_pdf(&input, &[None]);

    // Move the page's single stream into an indirect Contents array
    let mut doc = Document::load(&input).unwrap();
    let page_id = page_ids(&doc)[0];
    let stream_id = doc.get_dictionary(page_id).unwrap().get(b"Contents").unwrap().as_reference().unwrap();
    let array_id = doc.add_object(Object::Array(vec![Object::Reference(stream_id)]));
    doc.get_dictionary_mut(page_id).unwrap().set("Contents", array_id);
    doc.save(&input).unwrap();

    add_images_to_pdf(&input, &output, &assets, &temp.path().join("temp_files")).unwrap();

    let doc = Document::load(&output).unwrap();
    let ops = page_operations(&doc, page_ids(&doc)[0]);
    let marker = ops.iter().position(|op| op.operator == "re").expect("original drawing lost");
    assert_eq!(operands(&ops[marker]), vec![10.0, 10.0, 5.0, 5.0]);
    assert_eq!(ops.iter().filter(|op| op.operator == "Do").count(), 3);
}

#[test]
fn test_letter_geometry() {
    let temp = TempDir::new().unwrap();
    let assets = write_images(&temp.path().join("images"));
    let input = temp.path().join("letter.pdf");
    let output = temp.path().join("stamped.pdf");
    write_pdf(&input, &[None]);

    add_images_to_pdf(&input, &output, &assets, &temp.path().join("temp_files")).unwrap();

    let doc = Document::load(&output).unwrap();
    let cms = placements(&doc, page_ids(&doc)[0]);
    assert_eq!(cms.len(), 3);
    assert_placed(&cms, [249.12, 0.0, 0.0, 56.232, 356.976, 721.368]);
    assert_placed(&cms, [428.4, 0.0, 0.0, 396.0, 91.8, 198.0]);
    assert_placed(&cms, [597.6, 0.0, 0.0, 72.0, 7.2, 7.2]);
}

#[test]
fn test_watermark_opacity() {
    let temp = TempDir::new().unwrap();
    let assets = write_images(&temp.path().join("images"));
    let input = temp.path().join("input.pdf");
    let output = temp.path().join("output.pdf");
    write_pdf(&input, &[None]);

    add_images_to_pdf(&input, &output, &assets, &temp.path().join("temp_files")).unwrap();

    let doc = Document::load(&output).unwrap();
    let page_id = page_ids(&doc)[0];
    let resources = doc.get_dictionary(page_id).unwrap().get(b"Resources").unwrap().as_dict().unwrap();
    let states = resources.get(b"ExtGState").unwrap().as_dict().unwrap();
    assert_eq!(states.len(), 1);

    let (_, state) = states.iter().next().unwrap();
    let state = doc.get_dictionary(state.as_reference().unwrap()).unwrap();
    assert!((state.get(b"ca").unwrap().as_float().unwrap() - 0.15).abs() < 1e-4);
    assert!((state.get(b"CA").unwrap().as_float().unwrap() - 0.15).abs() < 1e-4);

    // Only the watermark sits inside the translucent state
    let ops = page_operations(&doc, page_id);
    let gs = ops.iter().position(|op| op.operator == "gs").unwrap();
    let draws_after_gs = ops[gs..]
        .iter()
        .take_while(|op| op.operator != "Q")
        .filter(|op| op.operator == "Do")
        .count();
    assert_eq!(draws_after_gs, 1);
}

#[test]
fn test_images_embedded_once() {
    let temp = TempDir::new().unwrap();
    let assets = write_images(&temp.path().join("images"));
    let input = temp.path().join("input.pdf");
    let output = temp.path().join("output.pdf");
    write_pdf(&input, &[None, None, None, None]);

    add_images_to_pdf(&input, &output, &assets, &temp.path().join("temp_files")).unwrap();

    let doc = Document::load(&output).unwrap();
    let images = doc
        .objects
        .values()
        .filter_map(|o| o.as_stream().ok())
        .filter(|s| s.dict.get(b"Subtype").and_then(|t| t.as_name()).map_or(false, |t| t == b"Image"))
        .count();
    // Header, footer, watermark and the watermark's soft mask
    assert_eq!(images, 4);
}

#[test]
fn test_mixed_page_sizes() {
    let temp = TempDir::new().unwrap();
    let assets = write_images(&temp.path().join("images"));
    let input = temp.path().join("mixed.pdf");
    let output = temp.path().join("output.pdf");
    write_pdf(&input, &[None, Some([0, 0, 842, 595]), Some([100, 100, 712, 892])]);

    add_images_to_pdf(&input, &output, &assets, &temp.path().join("temp_files")).unwrap();

    let doc = Document::load(&output).unwrap();
    let pages = page_ids(&doc);

    assert_placed(&placements(&doc, pages[0]), [249.12, 0.0, 0.0, 56.232, 356.976, 721.368]);

    // A4 landscape
    let landscape = placements(&doc, pages[1]);
    assert_placed(&landscape, [249.12, 0.0, 0.0, 56.232, 586.976, 524.368]);
    assert_placed(&landscape, [827.6, 0.0, 0.0, 72.0, 7.2, 7.2]);

    // Letter with a shifted origin
    let shifted = placements(&doc, pages[2]);
    assert_placed(&shifted, [249.12, 0.0, 0.0, 56.232, 456.976, 821.368]);
    assert_placed(&shifted, [597.6, 0.0, 0.0, 72.0, 107.2, 107.2]);
}

#[test]
fn test_missing_input_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let assets = write_images(&temp.path().join("images"));
    let output = temp.path().join("output.pdf");

    let result = add_images_to_pdf(
        &temp.path().join("missing.pdf"),
        &output,
        &assets,
        &temp.path().join("temp_files"),
    );

    assert!(matches!(result, Err(Error::MissingResource { resource: Resource::InputPdf, .. })));
    assert!(!output.exists());
}

#[test]
fn test_missing_footer_names_path() {
    let temp = TempDir::new().unwrap();
    let assets = write_images(&temp.path().join("images"));
    fs::remove_file(&assets.footer).unwrap();
    let input = temp.path().join("input.pdf");
    let output = temp.path().join("output.pdf");
    write_pdf(&input, &[None]);

    let err = add_images_to_pdf(&input, &output, &assets, &temp.path().join("temp_files")).unwrap_err();

    assert!(err.to_string().contains(&assets.footer.display().to_string()));
    assert!(matches!(err, Error::MissingResource { resource: Resource::FooterImage, .. }));
    assert!(!output.exists());
}

#[test]
fn test_corrupt_watermark_still_stamps() {
    let temp = TempDir::new().unwrap();
    let assets = write_images(&temp.path().join("images"));
    fs::write(&assets.watermark, b"not an image").unwrap();
    let input = temp.path().join("input.pdf");
    let output = temp.path().join("output.pdf");
    let scratch = temp.path().join("temp_files");
    write_pdf(&input, &[None, None]);

    let report = add_images_to_pdf(&input, &output, &assets, &scratch).unwrap();

    assert!(!report.watermark_applied);
    assert_eq!(count_pages(&output).unwrap(), 2);
    assert!(assets.watermark.exists());
    assert!(!scratch.exists());

    let doc = Document::load(&output).unwrap();
    assert_eq!(placements(&doc, page_ids(&doc)[0]).len(), 2);
}

#[test]
fn test_scratch_files_cleaned_up() {
    let temp = TempDir::new().unwrap();
    let assets = write_images(&temp.path().join("images"));
    let input = temp.path().join("input.pdf");
    write_pdf(&input, &[None]);

    let scratch = temp.path().join("temp_files");
    add_images_to_pdf(&input, &temp.path().join("a.pdf"), &assets, &scratch).unwrap();
    assert!(!scratch.exists());

    // Unrelated scratch files keep the directory alive
    fs::create_dir_all(&scratch).unwrap();
    fs::write(scratch.join("keep.tmp"), b"").unwrap();
    add_images_to_pdf(&input, &temp.path().join("b.pdf"), &assets, &scratch).unwrap();
    let left: Vec<_> = fs::read_dir(&scratch).unwrap().map(|e| e.unwrap().file_name()).collect();
    assert_eq!(left, vec!["keep.tmp"]);
}

#[test]
fn test_batch_ignores_non_pdf_files() {
    let temp = TempDir::new().unwrap();
    let layout = BatchLayout::rooted_at(temp.path());
    write_images(&temp.path().join("images"));
    fs::create_dir_all(&layout.input_dir).unwrap();
    write_pdf(&layout.input_dir.join("handout.pdf"), &[None, None]);
    fs::write(layout.input_dir.join("notes.txt"), b"not a pdf").unwrap();

    let summary = run_batch(&layout).unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.stamped.len(), 1);
    let outputs: Vec<_> = fs::read_dir(&layout.output_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(outputs, vec!["handout.pdf"]);
    assert_eq!(count_pages(&layout.output_dir.join("handout.pdf")).unwrap(), 2);
    assert!(!layout.scratch_dir.exists());
}

#[test]
fn test_batch_continues_after_failed_file() {
    let temp = TempDir::new().unwrap();
    let layout = BatchLayout::rooted_at(temp.path());
    write_images(&temp.path().join("images"));
    fs::create_dir_all(&layout.input_dir).unwrap();
    fs::write(layout.input_dir.join("a_broken.pdf"), b"this is not a pdf").unwrap();
    write_pdf(&layout.input_dir.join("b_good.pdf"), &[None]);

    let summary = run_batch(&layout).unwrap();

    assert!(!summary.is_success());
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, layout.input_dir.join("a_broken.pdf"));
    assert_eq!(summary.stamped.len(), 1);
    assert!(layout.output_dir.join("b_good.pdf").exists());
    assert!(!layout.output_dir.join("a_broken.pdf").exists());
}

#[test]
fn test_batch_missing_images_fails_every_file() {
    let temp = TempDir::new().unwrap();
    let layout = BatchLayout::rooted_at(temp.path());
    fs::create_dir_all(&layout.input_dir).unwrap();
    write_pdf(&layout.input_dir.join("one.pdf"), &[None]);
    write_pdf(&layout.input_dir.join("two.pdf"), &[None]);

    let summary = run_batch(&layout).unwrap();

    assert_eq!(summary.failed.len(), 2);
    assert!(summary
        .failed
        .iter()
        .all(|(_, e)| matches!(e, Error::MissingResource { resource: Resource::HeaderImage, .. })));
}
