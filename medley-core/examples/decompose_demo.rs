//! Walk a sample provider answer through the block decomposition engine.
//!
//! Run with: cargo run --example decompose_demo

use anyhow::Result;
use medley_core::blocks::decompose;

fn main() -> Result<()> {
    let answer = r#"## Comparing the options

Both approaches work, but they trade off differently.

- Approach A is simpler to operate
- Approach B scales further

```rust
fn pick(load: u64) -> &'static str {
    if load < 1_000 { "A" } else { "B" }
}
```

```mermaid
flowchart LR
  Start --> Decision{load?}
  Decision -->|low| A
  Decision -->|high| B
```

> Premature optimization is the root of all evil.

| Criterion | A | B |
|-----------|---|---|
| Ops cost  | low | high |

---

In short: start with A."#;

    let blocks = decompose(answer);
    println!("decomposed into {} blocks\n", blocks.len());
    for block in &blocks {
        let extra = match (&block.metadata.language, &block.metadata.chart_kind) {
            (Some(lang), _) => format!(" [{lang}]"),
            (_, Some(kind)) => format!(" [{kind}]"),
            _ if !block.metadata.items.is_empty() => {
                format!(" [{} items]", block.metadata.items.len())
            }
            _ => String::new(),
        };
        let preview: String = block.content.chars().take(48).collect();
        println!(
            "#{} {:?}{extra}: {}",
            block.index,
            block.kind,
            preview.replace('\n', " ⏎ ")
        );
    }

    Ok(())
}
