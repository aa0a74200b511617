//! Facility codes used by the dashboard export and the city / CEP each one
//! stands for.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit {
    pub code: &'static str,
    pub city: &'static str,
    pub postal_code: &'static str,
}

pub const UNITS: &[Unit] = &[
    Unit {
        code: "1odontologiasa",
        city: "Santo Antônio",
        postal_code: "59255-000",
    },
    Unit {
        code: "2odontologiana",
        city: "Natal (odonto)",
        postal_code: "59010-000",
    },
    Unit {
        code: "3odontologiasjm",
        city: "São José do Mipibu",
        postal_code: "59162-000",
    },
    Unit {
        code: "4odontologiacg",
        city: "Canguaretama",
        postal_code: "59190-000",
    },
    Unit {
        code: "5odontologiagoi",
        city: "Goianinha",
        postal_code: "59173-000",
    },
    Unit {
        code: "6mbestetica",
        city: "Natal (MBEstética)",
        postal_code: "59010-000",
    },
    Unit {
        code: "7odontoma",
        city: "Monte Alegre",
        postal_code: "59182-000",
    },
    Unit {
        code: "8odontologiabj",
        city: "Brejinho",
        postal_code: "59219-000",
    },
    Unit {
        code: "9odontorecife",
        city: "Recife",
        postal_code: "50010-000",
    },
];

pub fn unit_by_code(code: &str) -> Option<&'static Unit> {
    UNITS.iter().find(|unit| unit.code == code)
}
