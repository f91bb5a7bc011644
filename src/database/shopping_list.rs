use std::collections::HashMap;

use super::schema::CartLine;

/// Sums amounts per (ingredient name, unit), keeping the order in which each
/// pair first appears.
pub fn aggregate<I>(lines: I) -> Vec<CartLine>
where
    I: IntoIterator<Item = CartLine>,
{
    let mut positions: HashMap<(String, String), usize> = HashMap::new();
    let mut totals: Vec<CartLine> = Vec::new();

    for line in lines {
        let key = (line.name.to_owned(), line.measurement_unit.to_owned());
        match positions.get(&key) {
            Some(&position) => {
                let total = &mut totals[position];
                total.amount = total.amount.saturating_add(line.amount);
            }
            None => {
                positions.insert(key, totals.len());
                totals.push(line);
            }
        }
    }

    totals
}

/// Plain-text export served as `shopping_list.txt`.
pub fn render(lines: &[CartLine]) -> String {
    let mut s = String::from("Shopping list\n\n");

    lines.iter().enumerate().for_each(|(i, line)| {
        s += &format!(
            "{}. {} ({}) - {}\n",
            i + 1,
            line.name,
            line.measurement_unit,
            line.amount
        );
    });

    s
}
