//! System prompt and catalog snapshot rendering.

use std::fmt::Write as _;

use super::truncate_chars;
use crate::catalog::Product;
use crate::config::Persona;

const DESCRIPTION_CHARS: usize = 100;
const SPEC_CHARS: usize = 150;

/// Render the catalog snapshot embedded in the system prompt: one block
/// per product with name, brand, category, price, condition and stock.
pub fn render_catalog(products: &[Product]) -> String {
    if products.is_empty() {
        return "Nenhum produto disponível.".to_string();
    }

    let mut out = String::from("PRODUTOS DISPONÍVEIS:\n\n");
    for p in products {
        let brand = p.brand_name.as_deref().unwrap_or("Sem marca");
        let category = p.category_name.as_deref().unwrap_or("Sem categoria");

        let _ = writeln!(out, "- {}", p.name);
        let _ = writeln!(out, "  Marca: {brand} | Categoria: {category}");
        let _ = writeln!(out, "  Preço: R$ {:.2}", p.price);
        let _ = writeln!(
            out,
            "  Condição: {} | Estoque: {}",
            p.condition.as_str(),
            p.stock
        );
        if !p.description.is_empty() {
            let _ = writeln!(
                out,
                "  Descrição: {}",
                truncate_chars(&p.description, DESCRIPTION_CHARS)
            );
        }
        if !p.specs.is_empty() {
            let _ = writeln!(out, "  Specs: {}", truncate_chars(&p.specs, SPEC_CHARS));
        }
        out.push('\n');
    }
    out
}

/// Build the full system instruction: persona, behavioral rules, and the
/// rendered catalog snapshot.
pub fn system_prompt(persona: &Persona, products: &[Product]) -> String {
    format!(
        "Você é {seller}, vendedor experiente da {store}.\n\
         \n\
         COMPORTAMENTO:\n\
         - Mantenha contexto da conversa (use o histórico)\n\
         - Respostas curtas (30-40 palavras)\n\
         - Natural como humano\n\
         - SEM emojis excessivos (no máximo 1 por mensagem)\n\
         \n\
         CONHECIMENTO:\n\
         - Você TEM as informações de produtos (marca, condição, especificações)\n\
         - Se o cliente perguntar características, cite as especificações técnicas\n\
         \n\
         MEMÓRIA:\n\
         - Lembre do que foi dito antes\n\
         - \"sim\", \"qual preço\", \"me interessa\" = cliente falando do último produto mencionado\n\
         \n\
         LIMITAÇÕES:\n\
         - Se o produto não existe na lista: seja honesto\n\
         - Se o cliente quer encomendar: diga que vai chamar um humano\n\
         - NUNCA invente produtos que não estão na lista\n\
         \n\
         {catalog}",
        seller = persona.seller_name,
        store = persona.store_name,
        catalog = render_catalog(products),
    )
}
