//! The fixed extraction instruction sent alongside every document image.
//!
//! Callers can override it via [`crate::config::ExtractionConfig::instruction`];
//! the constant here is used only when no override is provided.

/// Field names the model is asked to return, in prompt order.
pub const RECORD_FIELDS: [&str; 11] = [
    "documentType",
    "country",
    "passportNumber",
    "surname",
    "givenName",
    "dateOfBirth",
    "gender",
    "placeOfBirth",
    "placeOfIssue",
    "dateOfIssue",
    "dateOfExpiry",
];

/// Default instruction asking for an 11-field JSON object.
pub const EXTRACTION_PROMPT: &str = r#"Extract the following fields from this ID or passport image and return them in JSON format:
{
  "documentType": "Type of document (e.g., Passport, ID card)",
  "country": "Issuing country",
  "passportNumber": "Document number",
  "surname": "Last name",
  "givenName": "First name",
  "dateOfBirth": "Date of birth (DD/MM/YYYY)",
  "gender": "Gender (M/F)",
  "placeOfBirth": "Place of birth",
  "placeOfIssue": "Place where the document was issued",
  "dateOfIssue": "Date when the document was issued (DD/MM/YYYY)",
  "dateOfExpiry": "Expiration date of the document (DD/MM/YYYY)"
}
If a field is not present in the image, use null for its value.
Just return the JSON, no other text or characters."#;
