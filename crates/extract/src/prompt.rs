pub const EXTRACTION_SYSTEM: &str = "You are an expert in domain knowledge extraction.";

pub const TURTLE_SYSTEM: &str =
    "You are an ontology expert familiar with JSON -> Turtle conversions.";

pub fn build_extraction_prompt(chunk_text: &str) -> String {
    format!(
        r#"Read the following document excerpt and extract the ontology it describes: its classes, individuals, object and data properties, and how they relate.

INSTRUCTIONS:
1. Every class or individual becomes an entity
2. Every link between two entities becomes a relationship
3. Output ONLY valid JSON, nothing else
4. Use the exact schema below

SCHEMA:
{{
  "entities": [
    {{
      "name": "EntityName",
      "type": "class|individual",
      "description": "brief definition",
      "superclasses": ["ParentClass"],
      "class": "ClassOfThisIndividual",
      "properties": {{"data_property": "value"}}
    }}
  ],
  "relationships": [
    {{"source": "EntityName", "type": "relationship_type", "target": "OtherEntity", "properties": {{"restriction": "value"}}}}
  ]
}}

RULES:
- "name" is required on every entity; use the name as written in the text
- "source" and "target" must be entity names from the "entities" list
- Relationship types should be verbs or verb phrases: "treats", "partOf", "measuredBy"
- Put cardinality or value restrictions and annotations in "properties"
- Omit "class" for classes and "superclasses" for individuals
- Output ONLY the JSON object, no markdown, no explanations

TEXT:
{}

JSON OUTPUT:"#,
        chunk_text
    )
}

pub fn build_retry_prompt(invalid_json: &str) -> String {
    format!(
        r#"The following JSON is invalid:

{}

Fix this JSON. Output only valid JSON with no markdown formatting, no code blocks, no explanations. Just the raw JSON object."#,
        invalid_json
    )
}

pub fn build_turtle_prompt(merged_json: &str, base_iri: &str) -> String {
    format!(
        r#"We have a combined ontology in JSON format. Convert it into a coherent OWL/Turtle ontology.

RULES:
- Use the base namespace <{}> with the prefix ":"
- Declare owl, rdf, rdfs and xsd prefixes
- Entities become owl:Class (or owl:NamedIndividual when "type" is "individual")
- Use "superclasses" for rdfs:subClassOf, "description" for rdfs:comment, "name" for rdfs:label
- Relationship types become owl:ObjectProperty with rdfs:domain and rdfs:range
- Return valid .ttl with no extra text

JSON data:
{}"#,
        base_iri, merged_json
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_embed_inputs() {
        assert!(build_extraction_prompt("The heart pumps blood.").contains("The heart pumps blood."));
        assert!(build_retry_prompt("{oops").contains("{oops"));

        let ttl = build_turtle_prompt("{\"entities\": []}", "http://example.org/onto#");
        assert!(ttl.contains("<http://example.org/onto#>"));
        assert!(ttl.contains("{\"entities\": []}"));
    }
}
