use std::path::Path;

use console::Style;

struct Styles {
    title: Style,
    label: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            label: Style::new().dim(),
            path: Style::new().underlined(),
        }
    }
}

/// Print a short styled summary after a synthesis run.
pub fn print_product_summary(
    title: &str,
    pattern: &str,
    product: &Path,
    quicklook: Option<&Path>,
) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to(title));
    println!(
        "  {:<12}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(pattern)
    );
    println!(
        "  {:<12}{}",
        s.label.apply_to("Product"),
        s.path.apply_to(product.display())
    );
    if let Some(path) = quicklook {
        println!(
            "  {:<12}{}",
            s.label.apply_to("Quicklook"),
            s.path.apply_to(path.display())
        );
    }
    println!();
}
