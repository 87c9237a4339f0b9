//! Synthetic station snapshots for benchmarking carburantes.

use carburantes_types::{DateKey, StationTable};
use chrono::{Local, NaiveDate};
use serde_json::{Map, Value, json};

/// Roughly the number of stations in a national snapshot.
pub const NATIONAL_STATIONS: usize = 12_000;

/// Price columns published by the API, most of them sparse.
const FUELS: [(&str, usize); 14] = [
    ("Gasoleo A", 1),
    ("Gasolina 95 E5", 1),
    ("Gasoleo Premium", 2),
    ("Gasolina 98 E5", 2),
    ("Gasoleo B", 4),
    ("Gasolina 95 E10", 20),
    ("Gasolina 95 E5 Premium", 8),
    ("Gasolina 98 E10", 40),
    ("Biodiesel", 50),
    ("Bioetanol", 60),
    ("Gases licuados del petróleo", 5),
    ("Gas Natural Comprimido", 30),
    ("Gas Natural Licuado", 45),
    ("Hidrogeno", 500),
];

const LOCALITIES: [&str; 8] = [
    "MADRID",
    "BARCELONA",
    "VALENCIA",
    "SEVILLA",
    "ZARAGOZA",
    "MALAGA",
    "MURCIA",
    "PALMA",
];

/// The date every synthetic table is stamped with.
#[must_use]
pub fn bench_date() -> DateKey {
    DateKey::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap_or_default())
}

/// Builds `stations` raw records shaped like the API's station objects.
///
/// Values are derived from the row index so every run sees the same data.
#[must_use]
pub fn synthetic_records(stations: usize) -> Vec<Map<String, Value>> {
    (0..stations)
        .map(|i| {
            let mut record = Map::new();
            record.insert("C.P.".into(), json!(format!("{:05}", 1000 + i % 50_000)));
            record.insert("Dirección".into(), json!(format!("CALLE {i}")));
            record.insert("Horario".into(), json!("L-D: 24H"));
            record.insert("Latitud".into(), json!(format!("{},{:06}", 36 + i % 8, i % 999_999)));
            record.insert("Localidad".into(), json!(LOCALITIES[i % LOCALITIES.len()]));
            record.insert("Longitud (WGS84)".into(), json!(format!("-{},{:06}", i % 9, i % 777_777)));
            record.insert("Margen".into(), json!(if i % 2 == 0 { "D" } else { "I" }));
            record.insert("Municipio".into(), json!(LOCALITIES[i % LOCALITIES.len()]));
            for (fuel, every) in FUELS {
                let price = if i % every == 0 {
                    json!(format!("1,{:03}", 400 + i % 300))
                } else {
                    json!("")
                };
                record.insert(format!("Precio {fuel}"), price);
            }
            record.insert("Provincia".into(), json!(LOCALITIES[i % LOCALITIES.len()]));
            record.insert("Remisión".into(), json!("dm"));
            record.insert("Rótulo".into(), json!(format!("MARCA {}", i % 40)));
            record.insert("Tipo Venta".into(), json!("P"));
            record.insert("IDEESS".into(), json!(format!("{}", 1000 + i)));
            record.insert("IDMunicipio".into(), json!(format!("{}", i % 8000)));
            record.insert("IDProvincia".into(), json!(format!("{:02}", i % 52)));
            record.insert("IDCCAA".into(), json!(format!("{:02}", i % 19)));
            record
        })
        .collect()
}

/// Builds a station table of `stations` rows with metadata columns stamped.
#[must_use]
pub fn synthetic_table(stations: usize) -> StationTable {
    let mut table =
        StationTable::from_records(bench_date(), Local::now(), &synthetic_records(stations));
    table.stamp_metadata();
    table
}

/// Serialises `stations` records inside the API response envelope.
#[must_use]
pub fn synthetic_body(stations: usize) -> Vec<u8> {
    json!({
        "Fecha": "15/01/2024 0:00:00",
        "ListaEESSPrecio": synthetic_records(stations),
        "Nota": "Archivo de todos los productos en todas las estaciones de servicio.",
        "ResultadoConsulta": "OK"
    })
    .to_string()
    .into_bytes()
}
