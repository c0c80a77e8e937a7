//! PDF rendering of [`Contract`]s.

use std::convert::Infallible;

use common::{operations::Render, Handler};

use crate::domain::Contract;

/// Renderer producing a printable PDF copy of a [`Contract`].
///
/// Emits a minimal single-page document with a textual summary. The
/// rendering backend is a collaborator seam: swapping in a richer renderer
/// only touches this module.
#[derive(Clone, Copy, Debug, Default)]
pub struct Renderer;

impl Renderer {
    /// Summary lines of the provided [`Contract`], top to bottom.
    fn lines(contract: &Contract) -> Vec<String> {
        let mut lines = vec![
            format!("Rental contract {}", contract.number),
            format!("Status: {}", contract.status),
            String::new(),
            format!("Vehicle: {}", contract.vehicle_id),
            format!("Renter: {}", contract.renter.name),
            format!("Email: {}", contract.renter.email),
        ];
        if let Some(phone) = &contract.renter.phone {
            lines.push(format!("Phone: {phone}"));
        }
        if let Some(address) = &contract.renter.address {
            lines.push(format!("Address: {address}"));
        }
        lines.extend([
            String::new(),
            format!(
                "Period: {} - {} ({} days)",
                contract.period.starts_at.to_rfc3339(),
                contract.period.ends_at.to_rfc3339(),
                contract.duration_days(),
            ),
            format!("Initial mileage: {} km", contract.period.initial_mileage),
            format!(
                "Allowed mileage: {}",
                contract
                    .period
                    .allowed_mileage
                    .map_or_else(|| "unlimited".to_owned(), |m| {
                        format!("{m} km")
                    }),
            ),
            format!("Daily rate: {}", contract.period.daily_rate),
            format!("Deposit: {}", contract.period.deposit),
            format!("Total amount: {}", contract.period.total_amount),
            String::new(),
            format!("Documents attached: {}", contract.documents.len()),
            format!(
                "Signatures: {} of 2",
                contract.signatures.count(),
            ),
        ]);
        if let Some(details) = &contract.return_details {
            lines.extend([
                String::new(),
                format!(
                    "Returned at {} with {} km ({})",
                    details.returned_at.to_rfc3339(),
                    details.final_mileage,
                    details.condition,
                ),
                format!("Mileage overage: {} km", contract.mileage_overage()),
            ]);
        }
        if let Some(notes) = &contract.notes {
            lines.extend([String::new(), format!("Notes: {notes}")]);
        }
        lines
    }

    /// Escapes the provided line for embedding into a PDF string literal.
    ///
    /// Non-ASCII characters are replaced, the built-in font carries no
    /// encoding for them.
    fn escape(line: &str) -> String {
        line.chars()
            .map(|c| match c {
                '(' => "\\(".to_owned(),
                ')' => "\\)".to_owned(),
                '\\' => "\\\\".to_owned(),
                c if c.is_ascii_graphic() || c == ' ' => c.to_string(),
                _ => "?".to_owned(),
            })
            .collect()
    }

    /// Assembles a single-page PDF document out of the provided text lines.
    fn document(lines: &[String]) -> Vec<u8> {
        let mut content =
            String::from("BT\n/F1 11 Tf\n14 TL\n72 790 Td\n");
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                content.push_str("T*\n");
            }
            content.push('(');
            content.push_str(&Self::escape(line));
            content.push_str(") Tj\n");
        }
        content.push_str("ET\n");

        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_owned(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_owned(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] \
             /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
                .to_owned(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>"
                .to_owned(),
            format!(
                "<< /Length {} >>\nstream\n{content}endstream",
                content.len(),
            ),
        ];

        let mut out = String::from("%PDF-1.4\n");
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.push_str(&format!("{} 0 obj\n{body}\nendobj\n", i + 1));
        }

        let xref_at = out.len();
        out.push_str(&format!(
            "xref\n0 {}\n0000000000 65535 f \n",
            objects.len() + 1,
        ));
        for offset in offsets {
            out.push_str(&format!("{offset:010} 00000 n \n"));
        }
        out.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF",
            objects.len() + 1,
        ));

        out.into_bytes()
    }
}

impl Handler<Render<Contract>> for Renderer {
    type Ok = Vec<u8>;
    type Err = Infallible;

    async fn execute(
        &self,
        Render(contract): Render<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(Self::document(&Self::lines(&contract)))
    }
}

#[cfg(test)]
mod spec {
    use super::Renderer;

    #[test]
    fn escapes_string_literals() {
        assert_eq!(Renderer::escape("plain text"), "plain text");
        assert_eq!(Renderer::escape("a (b) \\c"), "a \\(b\\) \\\\c");
        assert_eq!(Renderer::escape("caf\u{e9}"), "caf?");
    }

    #[test]
    fn emits_wellformed_document() {
        let bytes =
            Renderer::document(&["Rental contract LOC-2503-001".to_owned()]);
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("%PDF-1.4\n"));
        assert!(text.contains("(Rental contract LOC-2503-001) Tj"));
        assert!(text.ends_with("%%EOF"));

        // Cross-check the recorded cross-reference offsets.
        let xref_at: usize = text
            .rsplit("startxref\n")
            .next()
            .unwrap()
            .lines()
            .next()
            .unwrap()
            .parse()
            .unwrap();
        assert!(text[xref_at..].starts_with("xref\n"));
        for i in 1..=5 {
            let offset = text
                .lines()
                .skip_while(|l| *l != "xref")
                .nth(i + 2)
                .unwrap()
                .split_ascii_whitespace()
                .next()
                .unwrap()
                .parse::<usize>()
                .unwrap();
            assert!(text[offset..].starts_with(&format!("{i} 0 obj")));
        }
    }
}
