use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// One row of the product spreadsheet.
///
/// Cells are kept as optional raw text; placeholders for missing values are
/// applied when the row is rendered into catalog text, not when it is read.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRow {
    pub number: Option<String>,
    pub product_type: Option<String>,
    pub name: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<String>,
    pub image_url: Option<String>,
    pub remarks: Option<String>,
}

/// Spreadsheet columns understood by the catalog reader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProductColumn {
    Number,
    ProductType,
    Name,
    Price,
    Description,
    Ingredients,
    ImageUrl,
    Remarks,
}

impl ProductColumn {
    pub const ALL: [ProductColumn; 8] = [
        Self::Number,
        Self::ProductType,
        Self::Name,
        Self::Price,
        Self::Description,
        Self::Ingredients,
        Self::ImageUrl,
        Self::Remarks,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Self::Number => "Number",
            Self::ProductType => "Product Type",
            Self::Name => "Product Name",
            Self::Price => "Price",
            Self::Description => "Description",
            Self::Ingredients => "Ingredient",
            Self::ImageUrl => "Image URL",
            Self::Remarks => "Remarks",
        }
    }

    pub fn is_required(self) -> bool {
        !matches!(self, Self::ProductType)
    }

    pub fn from_header(header: &str) -> Option<Self> {
        let normalized = header.trim();
        Self::ALL.into_iter().find(|column| column.header().eq_ignore_ascii_case(normalized))
    }
}

/// Trims a cell and folds embedded line breaks (Alt-Enter in spreadsheets)
/// into single spaces, so one row always renders as one labeled record.
pub fn single_line(raw: &str) -> Cow<'_, str> {
    let trimmed = raw.trim();
    if !trimmed.contains(['\r', '\n']) {
        return Cow::Borrowed(trimmed);
    }
    let folded = trimmed
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Cow::Owned(folded)
}

impl ProductRow {
    pub fn set(&mut self, column: ProductColumn, value: Option<String>) {
        let value = value.map(|raw| single_line(&raw).into_owned()).filter(|raw| !raw.is_empty());
        let slot = match column {
            ProductColumn::Number => &mut self.number,
            ProductColumn::ProductType => &mut self.product_type,
            ProductColumn::Name => &mut self.name,
            ProductColumn::Price => &mut self.price,
            ProductColumn::Description => &mut self.description,
            ProductColumn::Ingredients => &mut self.ingredients,
            ProductColumn::ImageUrl => &mut self.image_url,
            ProductColumn::Remarks => &mut self.remarks,
        };
        *slot = value;
    }

    pub fn is_blank(&self) -> bool {
        self == &Self::default()
    }
}
