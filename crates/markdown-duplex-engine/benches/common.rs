// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
#[allow(dead_code)]
pub fn generate_markdown_content(sections: usize) -> String {
    let mut content = String::new();
    for section in 0..sections {
        content.push_str(&format!("## Section {section}\n\n"));
        content.push_str("Paragraph with some content spread over\ntwo source lines.\n\n");
        content.push_str("- Bullet point\n  - Nested item\n- Another item\n\n");
        if section % 3 == 0 {
            content.push_str("```rust\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n");
        }
        content.push_str("> quoted remark\n\n");
    }
    content
}
