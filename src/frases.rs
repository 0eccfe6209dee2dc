//! Canned phrase table: tag -> fixed list, uniform random pick.

use rand::Rng;

static FRASES: &[(&str, &[&str])] = &[
    (
        "motivacional",
        &[
            "Cada dia é uma nova chance de recomeçar.",
            "Grandes conquistas começam com pequenos passos.",
            "Disciplina é a ponte entre metas e realizações.",
            "O esforço de hoje é o resultado de amanhã.",
        ],
    ),
    (
        "financeiro",
        &[
            "Quem guarda o comprovante nunca discute a conta.",
            "Dinheiro controlado é dinheiro que rende.",
            "Pequenos gastos anotados evitam grandes sustos.",
        ],
    ),
    (
        "bomdia",
        &[
            "Bom dia! Que o café esteja forte e o dia leve.",
            "Bom dia, hoje é um ótimo dia para organizar as contas.",
            "Bom dia! Comece o dia com um sorriso.",
        ],
    ),
];

pub fn frases_for(tag: &str) -> Option<&'static [&'static str]> {
    FRASES
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, frases)| *frases)
}

/// Uniform random phrase for the tag, `None` for unknown tags.
pub fn pick(tag: &str) -> Option<&'static str> {
    let frases = frases_for(tag)?;
    let idx = rand::thread_rng().gen_range(0..frases.len());
    Some(frases[idx])
}

pub fn tags() -> Vec<&'static str> {
    FRASES.iter().map(|(t, _)| *t).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_returns_a_member_of_the_tag_list() {
        let frases = frases_for("motivacional").unwrap();
        for _ in 0..20 {
            let frase = pick("motivacional").unwrap();
            assert!(frases.contains(&frase));
        }
    }

    #[test]
    fn unknown_tag_yields_none() {
        assert!(pick("inexistente").is_none());
        assert!(frases_for("").is_none());
    }

    #[test]
    fn every_tag_has_phrases() {
        for tag in tags() {
            assert!(!frases_for(tag).unwrap().is_empty());
        }
    }
}
