//! `nitrilens tips`

const HOW_IT_WORKS: &[&str] = &[
    "Upload your test kit image",
    "The Gemini vision model looks at the whole image",
    "It finds the test tube and the reference color chart",
    "It matches the liquid color against each reference block",
    "You get a nitrite level with a confidence score and an explanation",
];

const TIPS: &[&str] = &[
    "Make sure both the test tube and the color chart are clearly visible",
    "Use good lighting (natural light preferred)",
    "Keep the image steady and in focus",
    "Include the entire test kit in the frame",
    "Avoid shadows covering the test tube or chart",
];

pub fn render() -> String {
    let mut out = String::from("How the analysis works:\n");
    for (i, step) in HOW_IT_WORKS.iter().enumerate() {
        out.push_str(&format!("  {}. {step}\n", i + 1));
    }
    out.push_str("\nTips for best results:\n");
    for tip in TIPS {
        out.push_str(&format!("  - {tip}\n"));
    }
    out.push_str("\nReadings are AI estimates for educational purposes only.\n");
    out
}

pub fn run() {
    print!("{}", render());
}
