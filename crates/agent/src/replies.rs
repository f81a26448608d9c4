use rand::seq::SliceRandom;
use rust_decimal::Decimal;

use optibot_core::config::BusinessConfig;

pub const GREETING_VARIANTS: &[&str] = &[
    "¡Hola! ¿En qué te puedo ayudar hoy?",
    "¡Buenas! Contame qué estás buscando.",
    "¡Hola! Bienvenido/a, ¿qué necesitás?",
];

pub const FAREWELL_VARIANTS: &[&str] = &[
    "¡Gracias por escribirnos! Que tengas un buen día.",
    "¡Hasta luego! Cualquier cosa volvé a escribirnos.",
    "¡Nos vemos! Te esperamos en el local.",
];

/// Variant choice is uniform random; callers must not depend on a
/// specific string, only on membership in the set.
pub fn greeting() -> String {
    pick(GREETING_VARIANTS)
}

pub fn farewell() -> String {
    pick(FAREWELL_VARIANTS)
}

fn pick(variants: &[&str]) -> String {
    variants
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("¡Hola!")
        .to_string()
}

pub fn location(business: &BusinessConfig) -> String {
    format!(
        "Estamos en {}. También podés llamarnos al {}.",
        business.address, business.phone
    )
}

pub fn hours(business: &BusinessConfig) -> String {
    format!("Nuestro horario de atención: {}.", business.hours)
}

pub fn insurance_list(business: &BusinessConfig) -> String {
    format!(
        "Trabajamos con estas obras sociales y prepagas: {}. Si la tuya no está en la lista, consultanos por teléfono al {}.",
        business.insurance_providers.join(", "),
        business.phone
    )
}

pub fn insurance_accepted(provider: &str) -> String {
    format!(
        "¡Sí! Trabajamos con {provider}. Traé tu credencial y la receta de tu oftalmólogo/a."
    )
}

pub fn contact_lenses(business: &BusinessConfig) -> String {
    format!(
        "Tenemos lentes de contacto descartables y de uso prolongado de varias marcas. Para la primera compra necesitás receta actualizada. Consultá medidas y precios al {}.",
        business.phone
    )
}

pub fn liquids() -> String {
    "Tenemos líquidos multipropósito y gotas humectantes de varias marcas y tamaños. \
     Preguntame por una marca puntual o escribí `precio líquidos` para ver valores."
        .to_string()
}

pub fn emergency(business: &BusinessConfig) -> String {
    format!(
        "Por lo que contás, lo mejor es que te vea un profesional cuanto antes: una guardia oftalmológica puede atenderte hoy mismo. No te automediques. Si querés, llamanos al {} y te orientamos.",
        business.phone
    )
}

pub fn unknown() -> String {
    "No te entendí del todo. Puedo ayudarte con: productos y marcas, precios, stock \
     (probá `#stock CÓDIGO`), lentes de contacto, líquidos, obras sociales, horarios y ubicación."
        .to_string()
}

pub fn code_clarification() -> String {
    format!(
        "Para consultar stock por código escribime así: `{} CÓDIGO` (por ejemplo `{} AR-01`).",
        crate::recognizer::CODE_LOOKUP_MARKER,
        crate::recognizer::CODE_LOOKUP_MARKER
    )
}

pub fn product_not_found() -> String {
    "No encontré productos con esa descripción. ¿Podés ser más específico/a? \
     Por ejemplo: marca, modelo o color."
        .to_string()
}

/// Formats a price the way the shop writes it: dot thousands separator,
/// comma decimals, two decimal places dropped when whole.
pub fn format_ars(price: Decimal) -> String {
    let rounded = price.round_dp(2);
    let text = rounded.to_string();
    let (integer_part, decimal_part) = match text.split_once('.') {
        Some((integer_part, decimal_part)) => (integer_part, Some(decimal_part)),
        None => (text.as_str(), None),
    };

    let digits: Vec<char> = integer_part.chars().collect();
    let mut grouped = String::new();
    for (position, digit) in digits.iter().enumerate() {
        if position > 0 && (digits.len() - position) % 3 == 0 && *digit != '-' {
            grouped.push('.');
        }
        grouped.push(*digit);
    }

    match decimal_part {
        Some(decimals) if decimals != "00" => format!("${grouped},{decimals}"),
        _ => format!("${grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{farewell, format_ars, greeting, FAREWELL_VARIANTS, GREETING_VARIANTS};

    #[test]
    fn greeting_and_farewell_stay_within_their_variant_sets() {
        for _ in 0..20 {
            assert!(GREETING_VARIANTS.contains(&greeting().as_str()));
            assert!(FAREWELL_VARIANTS.contains(&farewell().as_str()));
        }
    }

    #[test]
    fn prices_are_formatted_in_local_style() {
        assert_eq!(format_ars(Decimal::new(125_050, 2)), "$1.250,50");
        assert_eq!(format_ars(Decimal::new(980, 0)), "$980");
        assert_eq!(format_ars(Decimal::new(2_500_000, 2)), "$25.000");
        assert_eq!(format_ars(Decimal::new(1_234_567, 0)), "$1.234.567");
    }
}
