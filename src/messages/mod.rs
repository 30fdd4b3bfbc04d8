//! Printed labels and user-facing messages. Documents are issued in a single locale (`es-GT`).

#[derive(Debug, Clone, Copy)]
pub enum Messages {
    // Header / defaults
    DefaultTitle,
    DefaultItemsHeading,
    DefaultGroupTitle,

    // Meta
    Number,
    Date,
    Due,

    // Client / Event
    Client,
    Event,
    Dpi,

    // Items table
    Qty,
    Description,
    PricePerUnit,
    Total,

    // Totals
    SubtotalLabel,
    TaxLabel,
    TotalLabel,

    // Blocks
    BankData,
    Notes,
    Terms,
    BudgetConfirmation,
    SignatureLine,

    // Files
    InvoiceFilePrefix,
    DefaultClientFileName,

    // Validation
    TaxRateOutOfRange,
    NegativeAmount,
    CanNotBeEmpty,
    InvalidDate,
    PrimaryCurrencyMustBeGtq,
    SecondaryCurrencyMustBeUsd,
    ItemCurrencyNotConverted,

    // Infos
    PDFCreated,

    // Errors
    PDFNotCreated,
    InvalidInvoice,
}

impl Messages {
    pub fn msg(&self) -> &'static str {
        match self {
            Messages::DefaultTitle => "Propuesta / Factura",
            Messages::DefaultItemsHeading => "Detalle / Ítems",
            Messages::DefaultGroupTitle => "Items",

            Messages::Number => "N.º",
            Messages::Date => "Fecha",
            Messages::Due => "Vence",

            Messages::Client => "Cliente",
            Messages::Event => "Evento",
            Messages::Dpi => "DPI",

            Messages::Qty => "CANT",
            Messages::Description => "Descripción",
            Messages::PricePerUnit => "Precio U.",
            Messages::Total => "Total",

            Messages::SubtotalLabel => "SUBTOTAL",
            Messages::TaxLabel => "IMPUESTOS",
            Messages::TotalLabel => "TOTAL",

            Messages::BankData => "Datos bancarios",
            Messages::Notes => "Notas",
            Messages::Terms => "Condiciones del servicio",
            Messages::BudgetConfirmation => "Confirmación de presupuesto",
            Messages::SignatureLine => "Firma: ________________________________",

            Messages::InvoiceFilePrefix => "invoice",
            Messages::DefaultClientFileName => "cliente",

            Messages::TaxRateOutOfRange => "La tasa de impuesto debe estar entre 0 y 0.25",
            Messages::NegativeAmount => "El monto no puede ser negativo",
            Messages::CanNotBeEmpty => "No puede estar vacío",
            Messages::InvalidDate => "Fecha inválida, se espera AAAA-MM-DD",
            Messages::PrimaryCurrencyMustBeGtq => "La moneda principal debe ser GTQ",
            Messages::SecondaryCurrencyMustBeUsd => "La moneda secundaria debe ser USD",
            Messages::ItemCurrencyNotConverted => {
                "Moneda distinta a la de la factura, se suma sin conversión"
            }

            Messages::PDFCreated => "PDF creado",

            Messages::PDFNotCreated => "No se pudo crear el PDF",
            Messages::InvalidInvoice => "Factura inválida",
        }
    }
}

impl From<Messages> for String {
    fn from(val: Messages) -> Self {
        val.msg().to_owned()
    }
}

impl std::fmt::Display for Messages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg())
    }
}
