// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ABRASF request documents: the `EnviarLoteRpsEnvio` batch and the two
//! protocol queries.

use std::collections::HashSet;

use nfse_core::{
    taxid, Batch, InvoiceRecord, NfseError, Payer, Protocol, ProviderIdentity, ABRASF_NAMESPACE,
};
use tracing::debug;

use crate::dom::{Document, Element};

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Builds the unsigned batch document.
///
/// `LoteRps` gets `id="lote_<number>"` and each `InfRps` gets the record id,
/// so both can be targeted by signature references.
pub fn build_batch(batch: &Batch) -> Result<Document, NfseError> {
    if batch.is_empty() {
        return Err(NfseError::Validation("batch has no records".into()));
    }

    let mut seen = HashSet::new();
    for record in &batch.records {
        if !seen.insert(record.id.as_str()) {
            return Err(NfseError::Validation(format!(
                "duplicate RPS id `{}` in batch {}",
                record.id, batch.number
            )));
        }
    }

    let mut list = Element::new("ListaRps");
    for record in &batch.records {
        list.push_element(Element::new("Rps").with_child(inf_rps(record, &batch.provider)));
    }

    let lote = Element::new("LoteRps")
        .with_attribute("id", batch.element_id())
        .with_child(Element::text_element("NumeroLote", batch.number.to_string()))
        .with_child(Element::new("CpfCnpj").with_child(Element::text_element(
            "Cnpj",
            batch.provider.cnpj.as_str(),
        )))
        .with_child(Element::text_element(
            "InscricaoMunicipal",
            batch.provider.inscricao_municipal.as_str(),
        ))
        .with_child(Element::text_element(
            "QuantidadeRps",
            batch.records.len().to_string(),
        ))
        .with_child(list);

    debug!(batch_number = %batch.number, records = batch.len(), "built batch document");

    Ok(Document::new(
        Element::new("EnviarLoteRpsEnvio")
            .with_attribute("xmlns", ABRASF_NAMESPACE)
            .with_child(lote),
    ))
}

fn inf_rps(record: &InvoiceRecord, provider: &ProviderIdentity) -> Element {
    let identification = Element::new("IdentificacaoRps")
        .with_child(Element::text_element("Numero", record.number.as_str()))
        .with_child(Element::text_element("Serie", record.series.as_str()))
        .with_child(Element::text_element("Tipo", record.rps_type.to_string()));

    let values = Element::new("Valores")
        .with_child(Element::text_element(
            "ValorServicos",
            money(record.taxable_amount),
        ))
        .with_child(Element::text_element("ValorIss", money(record.tax_amount)))
        .with_child(Element::text_element(
            "Aliquota",
            format!("{:.4}", record.tax_rate),
        ));

    let service = Element::new("Servico")
        .with_child(values)
        .with_child(Element::text_element(
            "IssRetido",
            if record.tax_withheld { "1" } else { "2" },
        ))
        .with_child(Element::text_element(
            "ItemListaServico",
            record.service_code.as_str(),
        ))
        .with_child(Element::text_element(
            "Discriminacao",
            record.description.as_str(),
        ))
        .with_child(Element::text_element(
            "CodigoMunicipio",
            record.municipality_code.as_str(),
        ));

    Element::new("InfRps")
        .with_attribute("id", record.id.as_str())
        .with_child(identification)
        .with_child(Element::text_element(
            "DataEmissao",
            record.issued_at.format(DATE_FORMAT).to_string(),
        ))
        .with_child(Element::text_element("StatusRps", record.status.to_string()))
        .with_child(service)
        .with_child(prestador(provider))
        .with_child(tomador(&record.payer))
}

fn prestador(provider: &ProviderIdentity) -> Element {
    Element::new("Prestador")
        .with_child(
            Element::new("CpfCnpj")
                .with_child(Element::text_element("Cnpj", provider.cnpj.as_str())),
        )
        .with_child(Element::text_element(
            "InscricaoMunicipal",
            provider.inscricao_municipal.as_str(),
        ))
}

fn tomador(payer: &Payer) -> Element {
    let tax_id = taxid::normalize(&payer.tax_id);
    let id_kind = if tax_id.len() == 11 { "Cpf" } else { "Cnpj" };
    let address = &payer.address;

    Element::new("Tomador")
        .with_child(Element::new("IdentificacaoTomador").with_child(
            Element::new("CpfCnpj").with_child(Element::text_element(id_kind, tax_id)),
        ))
        .with_child(Element::text_element("RazaoSocial", payer.legal_name.as_str()))
        .with_child(
            Element::new("Endereco")
                .with_child(Element::text_element("Endereco", address.street.as_str()))
                .with_child(Element::text_element("Numero", address.number.as_str()))
                .with_child(Element::text_element("Bairro", address.district.as_str()))
                .with_child(Element::text_element(
                    "CodigoMunicipio",
                    address.municipality_code.as_str(),
                ))
                .with_child(Element::text_element("Uf", address.state.as_str()))
                .with_child(Element::text_element("Cep", address.postal_code.as_str())),
        )
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

/// `ConsultarSituacaoLoteRpsEnvio` for a protocol.
pub fn status_query(provider: &ProviderIdentity, protocol: &Protocol) -> Document {
    protocol_query("ConsultarSituacaoLoteRpsEnvio", provider, protocol)
}

/// `ConsultarLoteRpsEnvio` for a protocol.
pub fn lot_query(provider: &ProviderIdentity, protocol: &Protocol) -> Document {
    protocol_query("ConsultarLoteRpsEnvio", provider, protocol)
}

fn protocol_query(root: &str, provider: &ProviderIdentity, protocol: &Protocol) -> Document {
    Document::new(
        Element::new(root)
            .with_attribute("xmlns", ABRASF_NAMESPACE)
            .with_child(
                Element::new("Prestador")
                    .with_child(Element::text_element("Cnpj", provider.cnpj.as_str()))
                    .with_child(Element::text_element(
                        "InscricaoMunicipal",
                        provider.inscricao_municipal.as_str(),
                    )),
            )
            .with_child(Element::text_element("Protocolo", protocol.as_str())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use nfse_core::{Address, BatchNumber};
    use proptest::prelude::*;

    fn provider() -> ProviderIdentity {
        ProviderIdentity {
            cnpj: "32649500000145".into(),
            inscricao_municipal: "123".into(),
        }
    }

    fn record(id: &str) -> InvoiceRecord {
        InvoiceRecord {
            id: id.into(),
            number: "1".into(),
            series: "1".into(),
            rps_type: 1,
            issued_at: NaiveDate::from_ymd_opt(2025, 9, 30)
                .and_then(|d| d.and_hms_opt(11, 26, 56))
                .unwrap(),
            status: 1,
            description: "Consultoria & suporte".into(),
            service_code: "01.01".into(),
            taxable_amount: 1000.0,
            tax_amount: 50.0,
            tax_rate: 0.05,
            tax_withheld: false,
            municipality_code: "2700102".into(),
            payer: Payer {
                tax_id: "12.345.678/0001-95".into(),
                legal_name: "Empresa Tomadora".into(),
                address: Address {
                    street: "Rua das Flores".into(),
                    number: "123".into(),
                    district: "Centro".into(),
                    municipality_code: "2700102".into(),
                    state: "AL".into(),
                    postal_code: "57300000".into(),
                },
            },
        }
    }

    fn batch_of(n: usize) -> Batch {
        Batch::new(
            BatchNumber(20250930112656),
            provider(),
            (1..=n).map(|i| record(&format!("rps_{i}"))).collect(),
        )
    }

    #[test]
    fn batch_header_and_record_fields() {
        let doc = build_batch(&batch_of(1)).unwrap();
        let root = &doc.root;
        assert_eq!(root.name, "EnviarLoteRpsEnvio");
        assert_eq!(root.attribute("xmlns"), Some(ABRASF_NAMESPACE));

        let lote = root.child("LoteRps").unwrap();
        assert_eq!(lote.attribute("id"), Some("lote_20250930112656"));
        assert_eq!(lote.find_text("NumeroLote").as_deref(), Some("20250930112656"));

        let inf = lote.find("InfRps").unwrap();
        assert_eq!(inf.attribute("id"), Some("rps_1"));
        assert_eq!(inf.find_text("DataEmissao").as_deref(), Some("2025-09-30T11:26:56"));
        assert_eq!(inf.find_text("ValorServicos").as_deref(), Some("1000.00"));
        assert_eq!(inf.find_text("ValorIss").as_deref(), Some("50.00"));
        assert_eq!(inf.find_text("Aliquota").as_deref(), Some("0.0500"));
        assert_eq!(inf.find_text("IssRetido").as_deref(), Some("2"));
        assert_eq!(inf.find("Tomador").unwrap().find_text("Cnpj").as_deref(), Some("12345678000195"));
        assert_eq!(inf.find_text("Uf").as_deref(), Some("AL"));
    }

    #[test]
    fn cpf_payer_uses_cpf_element() {
        let mut batch = batch_of(1);
        batch.records[0].payer.tax_id = "529.982.247-25".into();
        let doc = build_batch(&batch).unwrap();
        let tomador = doc.root.find("Tomador").unwrap();
        assert_eq!(tomador.find_text("Cpf").as_deref(), Some("52998224725"));
        assert!(tomador.find("Cnpj").is_none());
    }

    #[test]
    fn empty_batch_is_rejected() {
        let err = build_batch(&batch_of(0)).unwrap_err();
        assert!(matches!(err, NfseError::Validation(_)));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut batch = batch_of(2);
        batch.records[1].id = "rps_1".into();
        assert!(build_batch(&batch).is_err());
    }

    #[test]
    fn protocol_queries() {
        let protocol = Protocol("TESTE_20250930112656".into());
        let status = status_query(&provider(), &protocol);
        assert_eq!(status.root.name, "ConsultarSituacaoLoteRpsEnvio");
        assert_eq!(
            status.root.child("Prestador").and_then(|p| p.find_text("Cnpj")).as_deref(),
            Some("32649500000145")
        );
        assert_eq!(status.root.find_text("Protocolo").as_deref(), Some("TESTE_20250930112656"));

        let lot = lot_query(&provider(), &protocol);
        assert_eq!(lot.root.name, "ConsultarLoteRpsEnvio");
        assert_eq!(lot.root.attribute("xmlns"), Some(ABRASF_NAMESPACE));
    }

    proptest! {
        #[test]
        fn quantity_matches_rps_count(n in 1usize..25) {
            let doc = build_batch(&batch_of(n)).unwrap();
            let quantity = doc.root.find_text("QuantidadeRps").unwrap();
            prop_assert_eq!(quantity, n.to_string());
            prop_assert_eq!(doc.root.find_all("Rps").len(), n);
            prop_assert_eq!(doc.paths_of("InfRps").len(), n);
        }
    }
}
