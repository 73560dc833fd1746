// src/services/document_service.rs

use std::{path::PathBuf, sync::Arc};

use genpdf::{elements, style, Element};
use image::Luma;
use qrcode::QrCode;

use crate::{
    common::error::AppError,
    models::outbound::GrnDocument,
    services::photo_service::{path_segment, PhotoService},
};

/// Quem transforma os dados da GRN em bytes de PDF.
pub trait GrnRenderer: Send + Sync + 'static {
    fn render(&self, document: &GrnDocument) -> Result<Vec<u8>, AppError>;
}

/// Renderizador real, com genpdf.
pub struct PdfGrnRenderer {
    fonts_dir: PathBuf,
    font_name: String,
}

impl PdfGrnRenderer {
    pub fn new(fonts_dir: impl Into<PathBuf>) -> Self {
        Self {
            fonts_dir: fonts_dir.into(),
            font_name: "Roboto".to_string(),
        }
    }
}

fn pdf_err(e: impl std::fmt::Display) -> AppError {
    AppError::DocumentError(e.to_string())
}

impl GrnRenderer for PdfGrnRenderer {
    fn render(&self, grn: &GrnDocument) -> Result<Vec<u8>, AppError> {
        // 1. Fonte
        let font_family = genpdf::fonts::from_files(&self.fonts_dir, &self.font_name, None).map_err(|_| {
            AppError::DocumentError(format!(
                "Fonte {} não encontrada em {}",
                self.font_name,
                self.fonts_dir.display()
            ))
        })?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(format!("GRN {}", grn.grn_no));
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        // --- CABEÇALHO ---
        doc.push(elements::Paragraph::new("GOODS RELEASE NOTE").styled(style::Style::new().bold().with_font_size(18)));
        doc.push(elements::Break::new(1));
        doc.push(elements::Paragraph::new(format!("GRN No: {}", grn.grn_no)).styled(style::Style::new().bold()));
        doc.push(elements::Paragraph::new(format!("Release Date: {}", grn.release_date.format("%d/%m/%Y"))));
        doc.push(elements::Paragraph::new(format!(
            "Lorry No: {}",
            grn.lorry_no.as_deref().unwrap_or("-")
        )));
        doc.push(elements::Break::new(1.5));

        // --- TABELA DE LOTES ---
        let mut table = elements::TableLayout::new(vec![1, 3, 2, 3, 3, 3, 2, 2, 3, 3, 3]);
        table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

        let small = style::Style::new().with_font_size(8);
        let small_bold = style::Style::new().bold().with_font_size(8);

        let mut header = table.row();
        for title in [
            "#", "Job No", "Lot", "Ex-W Lot", "Commodity", "Brand", "Shape", "Bundles", "Net", "Gross", "Actual",
        ] {
            header = header.element(elements::Paragraph::new(title).styled(small_bold));
        }
        header.push().map_err(pdf_err)?;

        for lot in &grn.lots {
            table
                .row()
                .element(elements::Paragraph::new(lot.index.to_string()).styled(small))
                .element(elements::Paragraph::new(lot.job_no.clone()).styled(small))
                .element(elements::Paragraph::new(lot.lot_no.to_string()).styled(small))
                .element(elements::Paragraph::new(lot.ex_warehouse_lot.clone()).styled(small))
                .element(elements::Paragraph::new(lot.commodity.clone()).styled(small))
                .element(elements::Paragraph::new(lot.brand.clone()).styled(small))
                .element(elements::Paragraph::new(lot.shape.clone()).styled(small))
                .element(elements::Paragraph::new(lot.bundles.to_string()).styled(small))
                .element(elements::Paragraph::new(format!("{:.3}", lot.net_weight)).styled(small))
                .element(elements::Paragraph::new(format!("{:.3}", lot.gross_weight)).styled(small))
                .element(elements::Paragraph::new(format!("{:.3}", lot.actual_weight)).styled(small))
                .push()
                .map_err(pdf_err)?;
        }

        table
            .row()
            .element(elements::Paragraph::new(""))
            .element(elements::Paragraph::new("TOTAL").styled(small_bold))
            .element(elements::Paragraph::new(""))
            .element(elements::Paragraph::new(""))
            .element(elements::Paragraph::new(""))
            .element(elements::Paragraph::new(""))
            .element(elements::Paragraph::new(""))
            .element(elements::Paragraph::new(grn.total_bundles.to_string()).styled(small_bold))
            .element(elements::Paragraph::new(format!("{:.3}", grn.total_net_weight)).styled(small_bold))
            .element(elements::Paragraph::new(format!("{:.3}", grn.total_gross_weight)).styled(small_bold))
            .element(elements::Paragraph::new(format!("{:.3}", grn.total_actual_weight)).styled(small_bold))
            .push()
            .map_err(pdf_err)?;

        doc.push(table);
        doc.push(elements::Break::new(2));

        // --- QR CODE DO NÚMERO DA GRN ---
        let code = QrCode::new(grn.grn_no.as_bytes()).map_err(pdf_err)?;
        let image_buffer = code.render::<Luma<u8>>().build();
        let dynamic_image = image::DynamicImage::ImageLuma8(image_buffer);
        let pdf_image = elements::Image::from_dynamic_image(dynamic_image)
            .map_err(pdf_err)?
            .with_scale(genpdf::Scale::new(0.5, 0.5));
        doc.push(pdf_image);

        // --- ASSINATURAS ---
        doc.push(elements::Break::new(2));
        let mut signatures = elements::TableLayout::new(vec![1, 1]);
        signatures
            .row()
            .element(elements::Paragraph::new("______________________"))
            .element(elements::Paragraph::new("______________________"))
            .push()
            .map_err(pdf_err)?;
        signatures
            .row()
            .element(elements::Paragraph::new("Driver").styled(small))
            .element(elements::Paragraph::new("Warehouse").styled(small))
            .push()
            .map_err(pdf_err)?;
        doc.push(signatures);

        // Renderiza para memória
        let mut buffer = Vec::new();
        doc.render(&mut buffer).map_err(pdf_err)?;
        Ok(buffer)
    }
}

/// PDF gerado e gravado em `grn/<grn>/<grn>.pdf`.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub bytes: Vec<u8>,
    pub file_path: String,
    pub file_size: i64,
}

#[derive(Clone)]
pub struct DocumentService {
    renderer: Arc<dyn GrnRenderer>,
    files: PhotoService,
}

impl DocumentService {
    pub fn new(renderer: Arc<dyn GrnRenderer>, files: PhotoService) -> Self {
        Self { renderer, files }
    }

    pub async fn render_and_store(&self, grn: &GrnDocument) -> Result<StoredDocument, AppError> {
        let bytes = self.renderer.render(grn)?;
        let safe_name = path_segment(&grn.grn_no);
        let file_path = format!("grn/{safe_name}/{safe_name}.pdf");
        let size = self.files.write_file(&file_path, &bytes).await?;

        tracing::info!("📄 GRN {} gerada ({} bytes)", grn.grn_no, size);
        Ok(StoredDocument {
            bytes,
            file_path,
            file_size: size as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct EchoRenderer;

    impl GrnRenderer for EchoRenderer {
        fn render(&self, grn: &GrnDocument) -> Result<Vec<u8>, AppError> {
            Ok(format!("%PDF {}", grn.grn_no).into_bytes())
        }
    }

    fn grn(grn_no: &str) -> GrnDocument {
        GrnDocument::new(grn_no, NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(), None, Vec::new())
    }

    #[tokio::test]
    async fn stores_pdf_under_grn_folder() {
        let dir = tempfile::tempdir().unwrap();
        let service = DocumentService::new(Arc::new(EchoRenderer), PhotoService::new(dir.path()));

        let stored = service.render_and_store(&grn("GRN-20250402-0001")).await.unwrap();

        assert_eq!(stored.file_path, "grn/GRN-20250402-0001/GRN-20250402-0001.pdf");
        assert_eq!(stored.file_size, stored.bytes.len() as i64);
        assert!(dir.path().join(&stored.file_path).exists());
    }

    #[test]
    fn missing_fonts_surface_as_document_error() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = PdfGrnRenderer::new(dir.path().join("no-fonts"));
        let err = renderer.render(&grn("GRN-X")).unwrap_err();
        assert!(matches!(err, AppError::DocumentError(_)));
    }
}
