//! Fixed prompt templates for the two documents the drafting page offers.
//!
//! Validation is limited to "no field blank"; values are interpolated as
//! typed, with no format checks on names, years or ID numbers.

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("Por favor, complete todos los campos.")]
    MissingField { field: &'static str },
}

pub trait PromptTemplate {
    /// Output file name the page offers for export.
    fn document_name(&self) -> &'static str;

    fn fields(&self) -> Vec<(&'static str, &str)>;

    fn render(&self) -> String;
}

/// Renders `template` after checking that every field has content.
pub fn build_prompt<T: PromptTemplate + ?Sized>(template: &T) -> Result<String, PromptError> {
    if let Some((field, _)) = template
        .fields()
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
    {
        return Err(PromptError::MissingField { field });
    }
    Ok(template.render())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessStatement {
    pub possessor_name: String,
    pub neighbor_name: String,
    pub years: String,
}

impl PromptTemplate for WitnessStatement {
    fn document_name(&self) -> &'static str {
        "declaracion_testigo"
    }

    fn fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("possessor_name", self.possessor_name.as_str()),
            ("neighbor_name", self.neighbor_name.as_str()),
            ("years", self.years.as_str()),
        ]
    }

    fn render(&self) -> String {
        let Self {
            possessor_name,
            neighbor_name,
            years,
        } = self;
        format!(
            "Actúa como un asistente legal experto en Colombia. Redacta un borrador formal y \
             detallado de una declaración juramentada para un proceso de pertenencia. El poseedor \
             se llama {possessor_name}, el testigo es su vecino, {neighbor_name}, y el testigo \
             puede dar fe de que {possessor_name} ha vivido en el inmueble de forma pública, \
             pacífica e ininterrumpida por más de {years} años. El documento debe incluir espacios \
             para las firmas, números de cédula, y la fecha, y estar listo para ser adaptado y \
             llevado a una notaría. Utiliza un lenguaje legal apropiado para Colombia."
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RightOfPetition {
    pub applicant_name: String,
    pub applicant_id: String,
    pub address: String,
}

impl PromptTemplate for RightOfPetition {
    fn document_name(&self) -> &'static str {
        "derecho_peticion"
    }

    fn fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("applicant_name", self.applicant_name.as_str()),
            ("applicant_id", self.applicant_id.as_str()),
            ("address", self.address.as_str()),
        ]
    }

    fn render(&self) -> String {
        let Self {
            applicant_name,
            applicant_id,
            address,
        } = self;
        format!(
            "Actúa como un asistente legal experto en Colombia. Redacta un borrador completo y \
             formal de un derecho de petición dirigido a la Oficina de Registro de Instrumentos \
             Públicos de [CIUDAD]. El solicitante es {applicant_name}, identificado con cédula de \
             ciudadanía N° {applicant_id}. La petición es para solicitar la siguiente información \
             sobre el inmueble ubicado en la dirección: {address}: 1) El folio de matrícula \
             inmobiliaria completo y actualizado. 2) Un historial detallado de todos los \
             propietarios anteriores. 3) Un certificado de tradición y libertad que indique si \
             existen gravámenes, embargos, hipotecas o cualquier otra limitación al dominio. El \
             documento debe citar el artículo 23 de la Constitución Política de Colombia y la Ley \
             1755 de 2015, y debe incluir secciones claras para la notificación y firma del \
             solicitante."
        )
    }
}
