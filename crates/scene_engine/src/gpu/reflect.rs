//! Uniform reflection over GLSL source text
//!
//! Produces the set of active uniform names a GL driver would report for a
//! program: plain uniforms by name, struct members as `name.field`, arrays
//! element-wise as `name[i]` (and `name[i].field` for arrays of structs).
//! Array sizes may be literals, `#define`s or `const int`s.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
struct Declaration {
    ty: String,
    name: String,
    len: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct UniformReflection {
    structs: HashMap<String, Vec<Declaration>>,
    constants: HashMap<String, usize>,
    uniforms: Vec<Declaration>,
}

impl UniformReflection {
    /// Parse one stage's source and merge its declarations
    pub(crate) fn add_source(&mut self, source: &str) {
        let text = strip_comments(source);

        let mut body = String::with_capacity(text.len());
        for line in text.lines() {
            let trimmed = line.trim();
            if let Some(rest) = trimmed.strip_prefix("#define") {
                let mut parts = rest.split_whitespace();
                if let (Some(name), Some(value)) = (parts.next(), parts.next()) {
                    if let Ok(value) = value.parse() {
                        self.constants.insert(name.to_string(), value);
                    }
                }
                continue;
            }
            if trimmed.starts_with('#') {
                continue;
            }
            body.push_str(trimmed);
            body.push(' ');
        }

        let body = self.extract_structs(&body);
        for statement in body.split(';') {
            // Keep only the text after the last brace: statements that follow
            // a function body or a struct block start there.
            let statement = statement
                .rsplit(|c| c == '{' || c == '}')
                .next()
                .unwrap_or("")
                .trim();
            self.parse_statement(statement);
        }
    }

    /// Flattened names of every active uniform
    pub(crate) fn uniform_names(&self) -> HashSet<String> {
        let mut names = HashSet::new();
        for uniform in &self.uniforms {
            self.expand(&uniform.name, &uniform.ty, uniform.len.as_deref(), &mut names, 0);
        }
        names
    }

    fn extract_structs(&mut self, body: &str) -> String {
        let mut remaining = String::with_capacity(body.len());
        let mut rest = body;
        while let Some(start) = find_keyword(rest, "struct") {
            remaining.push_str(&rest[..start]);
            let after = &rest[start + "struct".len()..];
            let Some(open) = after.find('{') else {
                rest = after;
                break;
            };
            let Some(close) = after[open..].find('}') else {
                rest = after;
                break;
            };
            let name = after[..open].trim().to_string();
            let members = after[open + 1..open + close]
                .split(';')
                .flat_map(parse_declarators)
                .collect();
            self.structs.insert(name, members);
            rest = &after[open + close + 1..];
        }
        remaining.push_str(rest);
        remaining
    }

    fn parse_statement(&mut self, statement: &str) {
        let mut statement = statement;
        if statement.starts_with("layout") {
            match statement.find(')') {
                Some(end) => statement = statement[end + 1..].trim_start(),
                None => return,
            }
        }

        if let Some(rest) = statement.strip_prefix("uniform ") {
            self.uniforms.extend(parse_declarators(rest));
        } else if let Some(rest) = statement.strip_prefix("const ") {
            // const int NAME = VALUE
            let Some((lhs, rhs)) = rest.split_once('=') else {
                return;
            };
            let mut lhs = lhs.split_whitespace();
            if let (Some("int" | "uint"), Some(name)) = (lhs.next(), lhs.next()) {
                if let Ok(value) = rhs.trim().trim_end_matches('u').parse() {
                    self.constants.insert(name.to_string(), value);
                }
            }
        }
    }

    fn array_len(&self, len: &str) -> Option<usize> {
        len.parse().ok().or_else(|| self.constants.get(len).copied())
    }

    fn expand(&self, name: &str, ty: &str, len: Option<&str>, out: &mut HashSet<String>, depth: usize) {
        if depth > 8 {
            log::warn!("Uniform '{}' nests structs too deeply, ignoring", name);
            return;
        }
        match len {
            Some(len) => match self.array_len(len) {
                Some(count) => {
                    for i in 0..count {
                        self.expand_element(&format!("{name}[{i}]"), ty, out, depth);
                    }
                }
                None => log::warn!("Cannot resolve array size '{}' of uniform '{}'", len, name),
            },
            None => self.expand_element(name, ty, out, depth),
        }
    }

    fn expand_element(&self, name: &str, ty: &str, out: &mut HashSet<String>, depth: usize) {
        match self.structs.get(ty) {
            Some(members) => {
                for member in members {
                    self.expand(
                        &format!("{name}.{}", member.name),
                        &member.ty,
                        member.len.as_deref(),
                        out,
                        depth + 1,
                    );
                }
            }
            None => {
                out.insert(name.to_string());
            }
        }
    }
}

/// Parse `type a, b[N] = init` into one declaration per declarator
fn parse_declarators(text: &str) -> Vec<Declaration> {
    let mut declarations = Vec::new();
    let text = strip_initializers(text);
    let mut parts = text.split(',');
    let Some(first) = parts.next() else {
        return declarations;
    };

    let (first, first_len) = split_array(first);
    let tokens: Vec<&str> = first.split_whitespace().collect();
    if tokens.len() < 2 {
        return declarations;
    }
    let ty = tokens[tokens.len() - 2].to_string();
    declarations.push(Declaration {
        ty: ty.clone(),
        name: tokens[tokens.len() - 1].to_string(),
        len: first_len,
    });

    for part in parts {
        let (name, len) = split_array(part);
        let name = name.trim();
        if !name.is_empty() {
            declarations.push(Declaration {
                ty: ty.clone(),
                name: name.to_string(),
                len,
            });
        }
    }
    declarations
}

/// Drop `= ...` initializers, keeping the commas that separate declarators
fn strip_initializers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    let mut skipping = false;
    for c in text.chars() {
        match c {
            '=' if depth == 0 => skipping = true,
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => skipping = false,
            _ => {}
        }
        if !skipping {
            out.push(c);
        }
    }
    out
}

fn split_array(text: &str) -> (&str, Option<String>) {
    match (text.find('['), text.find(']')) {
        (Some(open), Some(close)) if close > open => {
            (&text[..open], Some(text[open + 1..close].trim().to_string()))
        }
        _ => (text, None),
    }
}

fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let mut offset = 0;
    while let Some(pos) = text[offset..].find(keyword) {
        let start = offset + pos;
        let end = start + keyword.len();
        let before_ok = text[..start].chars().next_back().map_or(true, |c| !is_ident(c));
        let after_ok = text[end..].chars().next().map_or(true, |c| !is_ident(c));
        if before_ok && after_ok {
            return Some(start);
        }
        offset = end;
    }
    None
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '/' {
            match chars.peek() {
                Some('/') => {
                    for next in chars.by_ref() {
                        if next == '\n' {
                            out.push('\n');
                            break;
                        }
                    }
                    continue;
                }
                Some('*') => {
                    chars.next();
                    let mut previous = ' ';
                    for next in chars.by_ref() {
                        if previous == '*' && next == '/' {
                            break;
                        }
                        if next == '\n' {
                            out.push('\n');
                        }
                        previous = next;
                    }
                    out.push(' ');
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(source: &str) -> HashSet<String> {
        let mut reflection = UniformReflection::default();
        reflection.add_source(source);
        reflection.uniform_names()
    }

    #[test]
    fn test_plain_uniforms() {
        let found = names(
            "#version 330 core\n\
             uniform mat4 projectionMatrix; // camera\n\
             uniform mat4 modelViewMatrix;\n\
             /* uniform float disabled; */\n\
             layout(location = 0) uniform sampler2D albedoMap;\n\
             void main() { gl_Position = projectionMatrix * vec4(1.0); }\n",
        );
        assert_eq!(found.len(), 3);
        assert!(found.contains("projectionMatrix"));
        assert!(found.contains("albedoMap"));
        assert!(!found.contains("disabled"));
    }

    #[test]
    fn test_struct_arrays_expand_per_element() {
        let found = names(
            "#define MAX_LIGHTS 2\n\
             struct Attenuation { float constant; float linear; float exponent; };\n\
             struct PointLight {\n  vec3 color;\n  vec3 position;\n  float intensity;\n  Attenuation att;\n};\n\
             uniform PointLight pointLights[MAX_LIGHTS];\n\
             uniform float weights[3], bias;\n",
        );
        assert!(found.contains("pointLights[0].color"));
        assert!(found.contains("pointLights[1].att.exponent"));
        assert!(!found.contains("pointLights[2].color"));
        assert!(found.contains("weights[2]"));
        assert!(found.contains("bias"));
        assert_eq!(found.len(), 2 * 6 + 3 + 1);
    }

    #[test]
    fn test_const_int_array_size() {
        let found = names(
            "const int COUNT = 4;\n\
             struct Spot { vec3 dir; float cutoff; };\n\
             uniform Spot spots[COUNT];\n",
        );
        assert!(found.contains("spots[3].cutoff"));
        assert_eq!(found.len(), 8);
    }

    #[test]
    fn test_initialized_uniforms_keep_their_names() {
        let found = names(
            "uniform float exposure = 1.0;\n\
             uniform vec3 tint = vec3(1.0, 0.5, 0.25), shade;\n\
             uniform int samples[2] = int[2](1, 2);\n",
        );
        assert!(found.contains("exposure"));
        assert!(found.contains("tint"));
        assert!(found.contains("shade"));
        assert!(found.contains("samples[1]"));
        assert_eq!(found.len(), 5);
    }
}
