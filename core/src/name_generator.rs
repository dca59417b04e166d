//! Deterministic identity generation using curated lists.
//!
//! Supplies names, postcodes, dealers and vehicle makes for the synthetic
//! ledger. Same RNG seed = same output.

use crate::rng::LedgerRng;

/// Deterministic generator over curated lists.
pub struct NameGenerator;

impl NameGenerator {
    /// "SURNAME FIRSTNAME", the sortname convention of the extracts.
    pub fn generate_sortname(rng: &mut LedgerRng) -> String {
        let surname = Self::generate_surname(rng);
        let first = Self::generate_first_name(rng);
        format!("{} {}", surname.to_uppercase(), first.to_uppercase())
    }

    pub fn generate_first_name(rng: &mut LedgerRng) -> &'static str {
        *rng.pick(Self::first_names())
    }

    pub fn generate_surname(rng: &mut LedgerRng) -> &'static str {
        *rng.pick(Self::surnames())
    }

    /// A well-formed UK postcode such as "LS1 4AB".
    pub fn generate_postcode(rng: &mut LedgerRng) -> String {
        const INWARD_LETTERS: &[u8] = b"ABDEFGHJLNPQRSTUWXYZ";
        let area = rng.pick(Self::postcode_areas());
        let district = rng.range_i64(1, 29);
        let sector = rng.next_u64_below(10);
        let a = char::from(*rng.pick(INWARD_LETTERS));
        let b = char::from(*rng.pick(INWARD_LETTERS));
        format!("{area}{district} {sector}{a}{b}")
    }

    /// (dealer_ref, dealer_name)
    pub fn generate_dealer(rng: &mut LedgerRng) -> (String, &'static str) {
        let names = Self::dealer_names();
        let idx = rng.next_u64_below(names.len() as u64) as usize;
        (format!("D{:04}", idx + 1), names[idx])
    }

    pub fn generate_make(rng: &mut LedgerRng) -> &'static str {
        *rng.pick(Self::makes())
    }

    fn first_names() -> &'static [&'static str] {
        &[
            "Oliver", "George", "Harry", "Jack", "Jacob", "Noah", "Charlie", "Thomas",
            "Oscar", "William", "James", "Leo", "Alfie", "Henry", "Joshua", "Freddie",
            "Archie", "Ethan", "Isaac", "Alexander", "Joseph", "Edward", "Samuel", "Max",
            "Daniel", "Arthur", "Lucas", "Mohammed", "Logan", "Theo", "Olivia", "Amelia",
            "Isla", "Ava", "Emily", "Isabella", "Mia", "Poppy", "Ella", "Lily",
            "Jessica", "Sophie", "Grace", "Evie", "Ruby", "Chloe", "Sophia", "Freya",
            "Charlotte", "Daisy", "Alice", "Florence", "Phoebe", "Matilda", "Harriet", "Rosie",
            "Priya", "Aisha", "Zara", "Hannah",
        ]
    }

    fn surnames() -> &'static [&'static str] {
        &[
            "Smith", "Jones", "Taylor", "Brown", "Williams", "Wilson", "Johnson", "Davies",
            "Robinson", "Wright", "Thompson", "Evans", "Walker", "White", "Roberts", "Green",
            "Hall", "Wood", "Jackson", "Clarke", "Patel", "Khan", "Lewis", "James",
            "Phillips", "Mason", "Mitchell", "Rose", "Davis", "Rodriguez", "Cox", "Alexander",
            "Cooper", "Morris", "Ward", "Harris", "Turner", "Hughes", "Edwards", "Martin",
            "Parker", "Bennett", "Shaw", "Hussain", "Ali", "Begum", "Kaur", "Singh",
            "Murphy", "Kelly", "Campbell", "Stewart", "Anderson", "Scott", "Reid", "Ross",
            "Fraser", "Gibson", "Hunter", "Kennedy",
        ]
    }

    fn postcode_areas() -> &'static [&'static str] {
        &[
            "LS", "M", "B", "L", "S", "G", "EH", "CF", "BS", "NE", "NG", "LE", "SW", "SE",
            "N", "E", "W", "YO", "HU", "DN", "WF", "HD", "BD", "HX", "OL", "BL", "WN", "PR",
        ]
    }

    fn dealer_names() -> &'static [&'static str] {
        &[
            "Northgate Motors", "Riverside Autos", "Pennine Car Centre", "Castle Cars",
            "Summit Vehicle Sales", "Westway Motor Group", "Abbey Garage", "Kingsway Autos",
            "Harbour Motors", "Meadow Lane Cars", "Crown Motor Company", "Valley Vehicles",
        ]
    }

    fn makes() -> &'static [&'static str] {
        &[
            "Ford", "Vauxhall", "Volkswagen", "Toyota", "Nissan", "Kia", "Hyundai",
            "Peugeot", "Renault", "Skoda", "Audi", "BMW", "Mercedes-Benz", "MG",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{identity::normalize_postcode, rng::LedgerStream};

    #[test]
    fn sortname_generation_is_deterministic() {
        let mut rng1 = LedgerRng::new(12345, LedgerStream::Customers);
        let mut rng2 = LedgerRng::new(12345, LedgerStream::Customers);

        assert_eq!(
            NameGenerator::generate_sortname(&mut rng1),
            NameGenerator::generate_sortname(&mut rng2),
            "Same seed should produce same sortname"
        );
    }

    #[test]
    fn sortnames_have_surname_then_first_name() {
        let mut rng = LedgerRng::new(12345, LedgerStream::Customers);
        for _ in 0..100 {
            let name = NameGenerator::generate_sortname(&mut rng);
            let parts: Vec<&str> = name.split_whitespace().collect();
            assert_eq!(parts.len(), 2, "Sortname should have exactly 2 parts: {name}");
            assert_eq!(name, name.to_uppercase());
        }
    }

    #[test]
    fn generated_postcodes_pass_validation() {
        let mut rng = LedgerRng::new(99, LedgerStream::Customers);
        for _ in 0..200 {
            let postcode = NameGenerator::generate_postcode(&mut rng);
            assert!(
                normalize_postcode(Some(&postcode)).is_some(),
                "Generated postcode failed validation: {postcode}"
            );
        }
    }

    #[test]
    fn picks_come_from_the_curated_lists() {
        let mut rng = LedgerRng::new(5, LedgerStream::Contracts);
        for _ in 0..50 {
            let first: &'static str = NameGenerator::generate_first_name(&mut rng);
            let surname: &'static str = NameGenerator::generate_surname(&mut rng);
            let make: &'static str = NameGenerator::generate_make(&mut rng);
            assert!(NameGenerator::first_names().contains(&first));
            assert!(NameGenerator::surnames().contains(&surname));
            assert!(NameGenerator::makes().contains(&make));
        }
    }
}
