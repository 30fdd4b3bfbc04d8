use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::Path;

use log::{error, info};

use crate::FacturaError;
use crate::data::Invoice;
use crate::messages::Messages;

/// `invoice-{client name}.pdf`, whitespace runs in the name replaced by `_`.
pub fn suggested_file_name(invoice: &Invoice) -> String {
    let name = invoice.client.name.trim();
    let name = if name.is_empty() {
        Messages::DefaultClientFileName.msg().to_owned()
    } else {
        name.split_whitespace().collect::<Vec<_>>().join("_")
    };
    format!("{}-{name}.pdf", Messages::InvoiceFilePrefix)
}

/// Writes the PDF bytes, creating missing parent folders. Overwrites an existing file.
pub fn write_pdf_file(path: &Path, bytes: &[u8]) -> Result<(), FacturaError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            create_dir_all(parent)?;
        }
    }
    let mut file = File::create(path).map_err(|e| {
        error!("{}: {path:?}, {e}", Messages::PDFNotCreated);
        e
    })?;
    file.write_all(bytes)?;
    info!("{}: {path:?} ({} bytes)", Messages::PDFCreated, bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::invoice;

    #[test]
    fn file_name_from_client() {
        let inv = invoice(vec![], "0.12");
        assert_eq!(suggested_file_name(&inv), "invoice-FAUSTO_CASTILLO.pdf");
    }

    #[test]
    fn whitespace_runs_collapse() {
        let mut inv = invoice(vec![], "0.12");
        inv.client.name = "  Ana \t María   López ".into();
        assert_eq!(suggested_file_name(&inv), "invoice-Ana_María_López.pdf");
    }

    #[test]
    fn empty_client_name() {
        let mut inv = invoice(vec![], "0.12");
        inv.client.name = String::new();
        assert_eq!(suggested_file_name(&inv), "invoice-cliente.pdf");
    }

    #[test]
    fn writes_into_new_folder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("salida").join("factura.pdf");
        write_pdf_file(&path, b"%PDF-1.3").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.3");
    }
}
