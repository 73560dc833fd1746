// src/services/photo_service.rs

use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;

use crate::common::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoStage {
    Before,
    After,
}

impl PhotoStage {
    fn as_str(self) -> &'static str {
        match self {
            PhotoStage::Before => "before",
            PhotoStage::After => "after",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureRole {
    Driver,
    Warehouse,
}

impl SignatureRole {
    fn as_str(self) -> &'static str {
        match self {
            SignatureRole::Driver => "driver",
            SignatureRole::Warehouse => "warehouse",
        }
    }
}

/// Grava fotos e assinaturas (base64) no diretório de uploads.
/// Não participa da transação do banco.
#[derive(Debug, Clone)]
pub struct PhotoService {
    uploads_dir: PathBuf,
}

impl PhotoService {
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        Self { uploads_dir: uploads_dir.into() }
    }

    /// `repack/<job>_<lot>/bundle_<n>/<before|after>.<ext>`
    pub async fn save_bundle_photo(
        &self,
        payload: &str,
        job_no: &str,
        lot_no: i32,
        bundle_no: i32,
        stage: PhotoStage,
    ) -> Result<String, AppError> {
        let (bytes, extension) = decode_image(payload)?;
        let relative = format!(
            "repack/{}_{}/bundle_{}/{}.{}",
            path_segment(job_no),
            lot_no,
            bundle_no,
            stage.as_str(),
            extension
        );
        self.write_file(&relative, &bytes).await?;
        Ok(relative)
    }

    /// `grn/<grn>/<driver|warehouse>_signature.<ext>`
    pub async fn save_signature(&self, payload: &str, grn_no: &str, role: SignatureRole) -> Result<String, AppError> {
        let (bytes, extension) = decode_image(payload)?;
        let relative = format!(
            "grn/{}/{}_signature.{}",
            path_segment(grn_no),
            role.as_str(),
            extension
        );
        self.write_file(&relative, &bytes).await?;
        Ok(relative)
    }

    /// Grava `bytes` em `<uploads>/<relative>`, criando os diretórios. Devolve o tamanho.
    pub async fn write_file(&self, relative: &str, bytes: &[u8]) -> Result<u64, AppError> {
        let full = self.uploads_dir.join(relative);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, bytes).await?;
        tracing::debug!("💾 Arquivo gravado: {} ({} bytes)", full.display(), bytes.len());
        Ok(bytes.len() as u64)
    }
}

/// Decodifica base64 (com ou sem prefixo `data:<mime>;base64,`) e detecta o formato.
pub fn decode_image(payload: &str) -> Result<(Vec<u8>, &'static str), AppError> {
    let encoded = match payload.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => payload,
    };
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| AppError::BadRequest(format!("Imagem base64 inválida: {e}")))?;

    let format = image::guess_format(&bytes)
        .map_err(|_| AppError::BadRequest("Formato de imagem não reconhecido".into()))?;

    let extension = match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpg",
        ImageFormat::Gif => "gif",
        ImageFormat::WebP => "webp",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Tiff => "tiff",
        other => {
            return Err(AppError::BadRequest(format!("Formato de imagem não suportado: {other:?}")));
        }
    };
    Ok((bytes, extension))
}

/// Segmento de caminho seguro e reversível: letras, dígitos e `-` passam;
/// qualquer outro byte vira `_XX` (hex). Valores distintos nunca dividem pasta.
pub fn path_segment(raw: &str) -> String {
    let mut segment = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            segment.push(byte as char);
        } else {
            segment.push_str(&format!("_{byte:02X}"));
        }
    }
    segment
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn data_uri_prefix_is_stripped() {
        let payload = format!("data:image/png;base64,{}", STANDARD.encode(PNG_HEADER));
        let (bytes, ext) = decode_image(&payload).unwrap();
        assert_eq!(bytes, PNG_HEADER);
        assert_eq!(ext, "png");
    }

    #[test]
    fn jpeg_is_detected_without_prefix() {
        let payload = STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]);
        let (_, ext) = decode_image(&payload).unwrap();
        assert_eq!(ext, "jpg");
    }

    #[test]
    fn garbage_is_a_bad_request() {
        let err = decode_image("não é base64!").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = decode_image(&STANDARD.encode(b"plain text")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn path_segment_neutralises_traversal() {
        assert_eq!(path_segment("../JOB/1"), "_2E_2E_2FJOB_2F1");
        assert_eq!(path_segment("GRN-20250402-0001"), "GRN-20250402-0001");
    }

    #[test]
    fn look_alike_names_get_distinct_segments() {
        assert_ne!(path_segment("J.1"), path_segment("J_1"));
        assert_ne!(path_segment("A/1"), path_segment("A_1"));
        assert_eq!(path_segment("J_1"), "J_5F1");
    }

    #[tokio::test]
    async fn bundle_photo_lands_in_its_folder() {
        let dir = tempfile::tempdir().unwrap();
        let service = PhotoService::new(dir.path());
        let payload = STANDARD.encode(PNG_HEADER);

        let relative = service
            .save_bundle_photo(&payload, "JOB-7", 3, 2, PhotoStage::After)
            .await
            .unwrap();

        assert_eq!(relative, "repack/JOB-7_3/bundle_2/after.png");
        let written = std::fs::read(dir.path().join(&relative)).unwrap();
        assert_eq!(written, PNG_HEADER);
    }
}
